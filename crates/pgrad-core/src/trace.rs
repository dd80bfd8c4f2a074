use crate::{
    env::{Action, Env, SnapShot},
    policy::Policy,
    rng,
};
use anyhow::Result;
use tracing::debug;

/// One rollout. `observations` has one more entry than the other vectors: the observation reached
/// after the last step, which bootstrapping needs.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub observations: Vec<Vec<f32>>,
    pub actions: Vec<Action>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub logps: Vec<f32>,
}

impl Trace {
    pub fn push_step(
        &mut self,
        observation: Vec<f32>,
        action: Action,
        reward: f32,
        done: bool,
        logp: f32,
    ) {
        self.observations.push(observation);
        self.actions.push(action);
        self.rewards.push(reward);
        self.dones.push(done);
        self.logps.push(logp);
    }

    pub fn set_last_observation(&mut self, observation: Vec<f32>) {
        self.observations.push(observation);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Observations the actions were taken from, without the trailing one.
    pub fn step_observations(&self) -> &[Vec<f32>] {
        &self.observations[..self.len()]
    }

    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }

    pub fn terminated(&self) -> bool {
        self.dones.last().copied().unwrap_or(false)
    }
}

/// Resets `env` and runs `policy` until the episode ends or `max_steps` steps were taken. The
/// environment is never stepped past a `done`.
pub fn run_trace<P: Policy + ?Sized, E: Env + ?Sized>(
    policy: &P,
    env: &mut E,
    max_steps: Option<usize>,
) -> Result<Trace> {
    let mut trace = Trace::default();
    let mut observation = env.reset(rng::next_seed())?;
    loop {
        if max_steps.is_some_and(|max_steps| trace.len() >= max_steps) {
            break;
        }
        let (action, logp) = policy.get_action(&observation)?;
        let snapshot = env.step(&action)?;
        let done = snapshot.done();
        let SnapShot { state, reward, .. } = snapshot;
        trace.push_step(observation, action, reward, done, logp);
        observation = state;
        if done {
            break;
        }
    }
    trace.set_last_observation(observation);
    debug!(
        steps = trace.len(),
        reward = trace.total_reward(),
        terminated = trace.terminated(),
        "trace collected"
    );
    Ok(trace)
}

/// Runs one episode with the distribution's mode instead of a sample and returns its total reward.
pub fn run_greedy_episode<P: Policy + ?Sized, E: Env + ?Sized>(
    policy: &P,
    env: &mut E,
    max_steps: Option<usize>,
) -> Result<f32> {
    let mut observation = env.reset(rng::next_seed())?;
    let mut total_reward = 0f32;
    let mut steps = 0;
    while max_steps.is_none_or(|max_steps| steps < max_steps) {
        let action = policy.greedy_action(&observation)?;
        let snapshot = env.step(&action)?;
        total_reward += snapshot.reward;
        steps += 1;
        if snapshot.done() {
            break;
        }
        observation = snapshot.state;
    }
    Ok(total_reward)
}

/// Mean total reward of `episodes` greedy episodes.
pub fn evaluate_greedy<P: Policy + ?Sized, E: Env + ?Sized>(
    policy: &P,
    env: &mut E,
    episodes: usize,
    max_steps: Option<usize>,
) -> Result<f32> {
    let mut total = 0f32;
    for _ in 0..episodes {
        total += run_greedy_episode(policy, env, max_steps)?;
    }
    Ok(total / episodes.max(1) as f32)
}
