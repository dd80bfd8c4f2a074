use crate::{error::TrainError, trace::Trace};
use anyhow::Result;

/// Full discounted Monte-Carlo return for every step of a finished trace, accumulated backwards:
/// `G_{T-1} = r_{T-1}`, `G_t = r_t + gamma * G_{t+1}`.
pub fn discounted_returns(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.; rewards.len()];
    let mut running_return = 0f32;
    for (i, reward) in rewards.iter().enumerate().rev() {
        running_return = reward + gamma * running_return;
        returns[i] = running_return;
    }
    returns
}

/// n-step bootstrapped targets. `values` holds `V(o_0)..V(o_T)`, one more than `rewards`.
///
/// The lookahead shrinks to the remaining steps near the end of the trace. The sum stops at the
/// first terminal step inside the window, in which case no value estimate is added.
pub fn n_step_returns(
    rewards: &[f32],
    dones: &[bool],
    values: &[f32],
    n: usize,
    gamma: f32,
) -> Result<Vec<f32>> {
    let total_steps = rewards.len();
    if values.len() != total_steps + 1 {
        return Err(TrainError::DimensionMismatch {
            expected: total_steps + 1,
            actual: values.len(),
        }
        .into());
    }
    if dones.len() != total_steps {
        return Err(TrainError::DimensionMismatch {
            expected: total_steps,
            actual: dones.len(),
        }
        .into());
    }
    if n == 0 {
        return Err(TrainError::InvalidConfig("n-step lookahead must be at least 1".into()).into());
    }
    let returns = (0..total_steps)
        .map(|t| {
            let horizon = n.min(total_steps - t);
            let mut target = 0f32;
            let mut discount = 1f32;
            for k in 0..horizon {
                target += discount * rewards[t + k];
                discount *= gamma;
                if dones[t + k] {
                    return target;
                }
            }
            target + discount * values[t + horizon]
        })
        .collect();
    Ok(returns)
}

/// `A_t = G_t - V(o_t)`. Extra trailing values (the bootstrap observation) are ignored.
pub fn advantages(returns: &[f32], values: &[f32]) -> Vec<f32> {
    returns
        .iter()
        .zip(values.iter())
        .map(|(ret, value)| ret - value)
        .collect()
}

/// How per-step targets are computed from a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReturnEstimator {
    MonteCarlo,
    NStep { n: usize },
}

impl ReturnEstimator {
    /// `values` are the current value estimates for all of the trace's observations. Monte-Carlo
    /// returns ignore them.
    pub fn returns(&self, trace: &Trace, values: &[f32], gamma: f32) -> Result<Vec<f32>> {
        match self {
            Self::MonteCarlo => Ok(discounted_returns(&trace.rewards, gamma)),
            Self::NStep { n } => n_step_returns(&trace.rewards, &trace.dones, values, *n, gamma),
        }
    }
}
