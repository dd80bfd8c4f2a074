use anyhow::Result;
use pgrad_core::{
    env::{Action, Env, EnvironmentDescription, SnapShot, Space},
    error::TrainError,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[derive(Debug, Clone)]
pub struct CartPoleConfig {
    pub gravity: f32,
    pub mass_cart: f32,
    pub mass_pole: f32,
    pub length: f32,
    pub force_mag: f32,
    pub tau: f32,
    pub max_steps: usize,
    pub x_threshold: f32,
    pub theta_threshold: f32,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            max_steps: 500,
            x_threshold: 2.4,
            // 12 degrees
            theta_threshold: 12. * 2. * std::f32::consts::PI / 360.,
        }
    }
}

/// Pole balancing on a cart. Reward 1 per step, terminates when the pole falls or the cart leaves
/// the track, truncates after `max_steps`.
#[derive(Debug, Clone, Default)]
pub struct CartPole {
    pub config: CartPoleConfig,
    // x, x_dot, theta, theta_dot
    state: [f32; 4],
    steps: usize,
    done: bool,
}

impl CartPole {
    pub fn new(config: CartPoleConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }
}

impl Env for CartPole {
    fn reset(&mut self, seed: u64) -> Result<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.state = std::array::from_fn(|_| rng.random_range(-0.05..0.05));
        self.steps = 0;
        self.done = false;
        Ok(self.state.to_vec())
    }

    fn step(&mut self, action: &Action) -> Result<SnapShot> {
        if self.done {
            return Err(TrainError::StepAfterDone.into());
        }
        let push_right = match action {
            Action::Discrete(0) => false,
            Action::Discrete(1) => true,
            Action::Discrete(idx) => {
                return Err(TrainError::DimensionMismatch {
                    expected: 2,
                    actual: *idx,
                }
                .into());
            }
            Action::Continuous(_) => {
                return Err(TrainError::UnsupportedActionSpace(
                    "cartpole takes discrete actions".to_owned(),
                )
                .into());
            }
        };
        let CartPoleConfig {
            gravity,
            mass_cart,
            mass_pole,
            length,
            force_mag,
            tau,
            ..
        } = self.config;
        let [x, x_dot, theta, theta_dot] = self.state;
        let force = if push_right { force_mag } else { -force_mag };
        let (sin_theta, cos_theta) = theta.sin_cos();
        let total_mass = mass_cart + mass_pole;
        let pole_mass_length = mass_pole * length;
        let temp = (force + pole_mass_length * theta_dot.powi(2) * sin_theta) / total_mass;
        let theta_acc = (gravity * sin_theta - cos_theta * temp)
            / (length * (4.0 / 3.0 - mass_pole * cos_theta.powi(2) / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;
        self.state = [
            x + tau * x_dot,
            x_dot + tau * x_acc,
            theta + tau * theta_dot,
            theta_dot + tau * theta_acc,
        ];
        self.steps += 1;
        let terminated = self.state[0].abs() > self.config.x_threshold
            || self.state[2].abs() > self.config.theta_threshold;
        let truncated = !terminated && self.steps >= self.config.max_steps;
        self.done = terminated || truncated;
        Ok(SnapShot {
            state: self.state.to_vec(),
            reward: 1.,
            terminated,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let high = vec![
            self.config.x_threshold * 2.,
            f32::MAX,
            self.config.theta_threshold * 2.,
            f32::MAX,
        ];
        let low = high.iter().map(|bound| -bound).collect();
        EnvironmentDescription::new(
            Space::Continous {
                min: Some(low),
                max: Some(high),
                size: 4,
            },
            Space::Discrete(2),
        )
    }
}
