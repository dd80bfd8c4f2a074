// Small environments with known optimal behaviour, cheap enough for tests.

use anyhow::Result;
use pgrad_core::{
    env::{Action, ActionSpace, Env, EnvironmentDescription, SnapShot, Space},
    error::TrainError,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Each step shows one of `arms` one-hot contexts; choosing the matching arm pays 1, anything
/// else 0. Truncated after `episode_len` steps.
#[derive(Debug, Clone)]
pub struct ContextualBandit {
    pub arms: usize,
    pub episode_len: usize,
    rng: StdRng,
    context: usize,
    steps: usize,
    done: bool,
}

impl Default for ContextualBandit {
    fn default() -> Self {
        Self::new(2, 10)
    }
}

impl ContextualBandit {
    pub fn new(arms: usize, episode_len: usize) -> Self {
        Self {
            arms,
            episode_len,
            rng: StdRng::seed_from_u64(0),
            context: 0,
            steps: 0,
            done: false,
        }
    }

    fn observation(&mut self) -> Vec<f32> {
        self.context = self.rng.random_range(0..self.arms);
        let mut observation = vec![0.; self.arms];
        observation[self.context] = 1.;
        observation
    }
}

impl Env for ContextualBandit {
    fn reset(&mut self, seed: u64) -> Result<Vec<f32>> {
        self.rng = StdRng::seed_from_u64(seed);
        self.steps = 0;
        self.done = false;
        Ok(self.observation())
    }

    fn step(&mut self, action: &Action) -> Result<SnapShot> {
        if self.done {
            return Err(TrainError::StepAfterDone.into());
        }
        let Action::Discrete(arm) = action else {
            return Err(TrainError::UnsupportedActionSpace(
                "bandit takes discrete actions".to_owned(),
            )
            .into());
        };
        let reward = if *arm == self.context { 1. } else { 0. };
        self.steps += 1;
        self.done = self.steps >= self.episode_len;
        Ok(SnapShot {
            state: self.observation(),
            reward,
            terminated: false,
            truncated: self.done,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![self.arms]),
            Space::Discrete(self.arms),
        )
    }
}

/// Observes a target in `[-1, 1]` fixed for the episode and is paid `-(a - target)^2`, with the
/// action clamped into `[-2, 2]`. Terminates after `episode_len` steps.
#[derive(Debug, Clone)]
pub struct Reach {
    pub episode_len: usize,
    target: f32,
    steps: usize,
    done: bool,
}

impl Default for Reach {
    fn default() -> Self {
        Self {
            episode_len: 5,
            target: 0.,
            steps: 0,
            done: false,
        }
    }
}

impl Reach {
    fn action_space() -> ActionSpace {
        ActionSpace::ContinuousBox {
            dims: 1,
            low: Some(vec![-2.]),
            high: Some(vec![2.]),
        }
    }
}

impl Env for Reach {
    fn reset(&mut self, seed: u64) -> Result<Vec<f32>> {
        self.target = StdRng::seed_from_u64(seed).random_range(-1. ..1.);
        self.steps = 0;
        self.done = false;
        Ok(vec![self.target])
    }

    fn step(&mut self, action: &Action) -> Result<SnapShot> {
        if self.done {
            return Err(TrainError::StepAfterDone.into());
        }
        let value = match action.clone().clamp(&Self::action_space()) {
            Action::Continuous(values) if values.len() == 1 => values[0],
            _ => {
                return Err(TrainError::UnsupportedActionSpace(
                    "reach takes a single continuous action".to_owned(),
                )
                .into());
            }
        };
        self.steps += 1;
        self.done = self.steps >= self.episode_len;
        Ok(SnapShot {
            state: vec![self.target],
            reward: -(value - self.target).powi(2),
            terminated: self.done,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![1]),
            Space::Continous {
                min: Some(vec![-2.]),
                max: Some(vec![2.]),
                size: 1,
            },
        )
    }
}

#[cfg(test)]
mod test {
    use super::{ContextualBandit, Reach};
    use anyhow::Result;
    use pgrad_core::env::{Action, Env};

    #[test]
    fn bandit_pays_for_the_matching_arm() -> Result<()> {
        let mut env = ContextualBandit::default();
        let mut observation = env.reset(5)?;
        let mut total = 0.;
        for _ in 0..env.episode_len {
            let arm = observation.iter().position(|v| *v == 1.).unwrap_or_default();
            let snapshot = env.step(&Action::Discrete(arm))?;
            total += snapshot.reward;
            observation = snapshot.state;
        }
        assert_eq!(total, env.episode_len as f32);
        assert!(env.step(&Action::Discrete(0)).is_err());
        Ok(())
    }

    #[test]
    fn reach_rewards_hitting_the_target() -> Result<()> {
        let mut env = Reach::default();
        let target = env.reset(9)?[0];
        assert_eq!(env.step(&Action::Continuous(vec![target]))?.reward, 0.);
        assert!(env.step(&Action::Continuous(vec![target + 1.]))?.reward < 0.);
        // clamped to 2, so the reward is bounded by the distance to the box edge
        let clamped = env.step(&Action::Continuous(vec![100.]))?.reward;
        assert_eq!(clamped, -(2. - target).powi(2));
        Ok(())
    }
}
