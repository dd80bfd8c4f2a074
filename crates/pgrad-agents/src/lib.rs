pub mod actor_critic;
pub mod on_policy_algorithm;
pub mod reinforce;

use actor_critic::ActorCritic;
use anyhow::Result;
use pgrad_candle::{
    batch::RolloutBatch,
    distributions::DistributionKind,
    learning_module::{DecoupledActorCriticLM, LearningModule, PolicyValuesLosses},
    objectives::ObjectiveBuilder,
};
use pgrad_core::{env::Env, reward_curve::RewardCurve, trace::Trace};
use reinforce::Reinforce;

/// Everything that changes while training: parameters, optimizer moments and the reward history.
/// Each epoch consumes the state and hands back the next one.
#[derive(Debug)]
pub struct TrainingState {
    pub learning_module: DecoupledActorCriticLM,
    pub reward_curve: RewardCurve,
    pub epoch: usize,
}

impl TrainingState {
    pub fn new(learning_module: DecoupledActorCriticLM) -> Self {
        Self {
            learning_module,
            reward_curve: RewardCurve::default(),
            epoch: 0,
        }
    }

    /// The current policy, for sampling or evaluation.
    pub fn policy(&self) -> &DistributionKind {
        &self.learning_module.distribution
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Mean over the epoch's traces of each trace's summed reward.
    pub epoch_reward: f32,
    pub traces: usize,
    pub steps: usize,
    pub policy_loss: f32,
    pub value_loss: Option<f32>,
}

pub trait Trainer {
    /// Checks that the learning module has everything the algorithm needs. Runs before the
    /// environment is touched.
    fn validate(&self, state: &TrainingState) -> Result<()>;

    /// Collects one epoch of traces with the current policy and applies one update.
    fn run_epoch<E: Env + ?Sized>(
        &self,
        env: &mut E,
        state: TrainingState,
    ) -> Result<(TrainingState, EpochReport)>;
}

#[derive(Debug, Clone)]
pub enum AgentKind {
    Reinforce(Reinforce),
    ActorCritic(ActorCritic),
}

impl Trainer for AgentKind {
    fn validate(&self, state: &TrainingState) -> Result<()> {
        match self {
            Self::Reinforce(agent) => agent.validate(state),
            Self::ActorCritic(agent) => agent.validate(state),
        }
    }

    fn run_epoch<E: Env + ?Sized>(
        &self,
        env: &mut E,
        state: TrainingState,
    ) -> Result<(TrainingState, EpochReport)> {
        match self {
            Self::Reinforce(agent) => agent.run_epoch(env, state),
            Self::ActorCritic(agent) => agent.run_epoch(env, state),
        }
    }
}

pub(crate) fn epoch_reward(traces: &[Trace]) -> f32 {
    if traces.is_empty() {
        return 0.;
    }
    traces.iter().map(Trace::total_reward).sum::<f32>() / traces.len() as f32
}

/// Flattens the traces, builds the losses and takes one optimizer step per module. The value
/// loss regresses onto `returns` and is only built when `train_value` is set.
pub(crate) fn update_from_traces(
    learning_module: &mut DecoupledActorCriticLM,
    traces: &[Trace],
    returns: &[Vec<f32>],
    advantages: &[Vec<f32>],
    objective: ObjectiveBuilder,
    train_value: bool,
) -> Result<EpochReport> {
    let batch = RolloutBatch::new(
        traces,
        returns,
        advantages,
        &learning_module.distribution,
        &learning_module.device,
    )?;
    let policy_loss = objective.policy_loss(&learning_module.distribution, &batch)?;
    let value_loss = match (&learning_module.value_module, train_value) {
        (Some(value_module), true) => {
            Some(objective.value_loss(&value_module.value_function, &batch)?)
        }
        _ => None,
    };
    let report = EpochReport {
        epoch_reward: epoch_reward(traces),
        traces: traces.len(),
        steps: batch.len(),
        policy_loss: policy_loss.to_scalar::<f32>()?,
        value_loss: value_loss
            .as_ref()
            .map(|loss| loss.to_scalar::<f32>())
            .transpose()?,
    };
    learning_module.update(PolicyValuesLosses {
        policy_loss,
        value_loss,
    })?;
    Ok(report)
}
