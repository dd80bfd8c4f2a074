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

/// Actor-critic with n-step bootstrapped targets on fixed-length traces. The value module is
/// mandatory. Without `baseline` the raw targets are used as advantages.
#[derive(Debug, Clone)]
pub struct ActorCritic {
    pub gamma: f32,
    pub traces: usize,
    pub trace_len: usize,
    pub n: usize,
    pub baseline: bool,
    pub entropy_factor: Option<f32>,
}

impl Default for ActorCritic {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            traces: 5,
            trace_len: 500,
            n: 10,
            baseline: true,
            entropy_factor: None,
        }
    }
}

impl Trainer for ActorCritic {
    fn validate(&self, state: &TrainingState) -> Result<()> {
        if !state.learning_module.has_value_module() {
            return Err(TrainError::MissingValueModule {
                algorithm: "ac_bootstrap".to_owned(),
            }
            .into());
        }
        if self.n == 0 || self.trace_len == 0 {
            return Err(TrainError::InvalidConfig(
                "n and trace_len must be at least 1".to_owned(),
            )
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
            .map(|_| run_trace(&learning_module.distribution, &mut *env, Some(self.trace_len)))
            .collect::<Result<Vec<Trace>>>()?;
        let estimator = ReturnEstimator::NStep { n: self.n };
        let mut all_returns = Vec::with_capacity(traces.len());
        let mut all_advantages = Vec::with_capacity(traces.len());
        for trace in traces.iter() {
            // includes the observation after the last step
            let values = learning_module.values(&trace.observations)?;
            let returns = estimator.returns(trace, &values, self.gamma)?;
            let trace_advantages = if self.baseline {
                advantages(&returns, &values)
            } else {
                returns.clone()
            };
            all_advantages.push(trace_advantages);
            all_returns.push(returns);
        }
        debug!(reward = epoch_reward(&traces), "actor-critic epoch collected");
        let objective = ObjectiveBuilder {
            entropy_factor: self.entropy_factor,
        };
        let report = update_from_traces(
            learning_module,
            &traces,
            &all_returns,
            &all_advantages,
            objective,
            true,
        )?;
        Ok((state, report))
    }
}
