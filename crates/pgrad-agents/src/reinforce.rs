use crate::{EpochReport, Trainer, TrainingState, epoch_reward, update_from_traces};
use anyhow::Result;
use pgrad_candle::objectives::ObjectiveBuilder;
use pgrad_core::{
    env::Env,
    error::TrainError,
    returns::{ReturnEstimator, advantages},
    trace::{Trace, run_trace},
};
use tracing::debug;

/// Monte-Carlo policy gradient over complete episodes. With `baseline` set, the value module's
/// estimates are subtracted from the returns and the value module is regressed onto them.
#[derive(Debug, Clone)]
pub struct Reinforce {
    pub gamma: f32,
    pub traces: usize,
    /// Cap on episode length, `None` runs until the environment reports done.
    pub max_episode_steps: Option<usize>,
    pub baseline: bool,
    pub entropy_factor: Option<f32>,
}

impl Default for Reinforce {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            traces: 5,
            max_episode_steps: Some(500),
            baseline: false,
            entropy_factor: None,
        }
    }
}

impl Trainer for Reinforce {
    fn validate(&self, state: &TrainingState) -> Result<()> {
        if self.baseline && !state.learning_module.has_value_module() {
            return Err(TrainError::MissingValueModule {
                algorithm: "reinforce with baseline".to_owned(),
            }
            .into());
        }
        Ok(())
    }

    fn run_epoch<E: Env + ?Sized>(
        &self,
        env: &mut E,
        mut state: TrainingState,
    ) -> Result<(TrainingState, EpochReport)> {
        let learning_module = &mut state.learning_module;
        let traces = (0..self.traces)
            .map(|_| run_trace(&learning_module.distribution, &mut *env, self.max_episode_steps))
            .collect::<Result<Vec<Trace>>>()?;
        let mut all_returns = Vec::with_capacity(traces.len());
        let mut all_advantages = Vec::with_capacity(traces.len());
        for trace in traces.iter() {
            let returns = ReturnEstimator::MonteCarlo.returns(trace, &[], self.gamma)?;
            let values = if self.baseline {
                learning_module.values(trace.step_observations())?
            } else {
                vec![0.; trace.len()]
            };
            all_advantages.push(advantages(&returns, &values));
            all_returns.push(returns);
        }
        debug!(reward = epoch_reward(&traces), "reinforce epoch collected");
        let objective = ObjectiveBuilder {
            entropy_factor: self.entropy_factor,
        };
        let report = update_from_traces(
            learning_module,
            &traces,
            &all_returns,
            &all_advantages,
            objective,
            self.baseline,
        )?;
        Ok((state, report))
    }
}
