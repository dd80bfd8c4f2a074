use crate::{
    batch::observations_tensor,
    distributions::{Distribution, DistributionKind},
    optimizer::OptimizerWithMaxGrad,
    tensors::{PolicyLoss, ValueLoss},
    value_function::{SequentialValueFunction, ValueFunction},
};
use anyhow::Result;
use candle_core::Device;

pub trait LearningModule {
    type Losses;

    fn update(&mut self, losses: Self::Losses) -> Result<()>;
}

pub struct PolicyValuesLosses {
    pub policy_loss: PolicyLoss,
    pub value_loss: Option<ValueLoss>,
}

/// State-value estimator with an optimizer of its own.
#[derive(Debug)]
pub struct ValueModule {
    pub value_function: SequentialValueFunction,
    pub optimizer: OptimizerWithMaxGrad,
}

/// The policy and the optional value module have separate parameters and optimizers.
#[derive(Debug)]
pub struct DecoupledActorCriticLM {
    pub distribution: DistributionKind,
    pub policy_optimizer: OptimizerWithMaxGrad,
    pub value_module: Option<ValueModule>,
    pub device: Device,
}

impl DecoupledActorCriticLM {
    pub fn policy_learning_rate(&self) -> f64 {
        self.policy_optimizer.optimizer.learning_rate()
    }

    pub fn has_value_module(&self) -> bool {
        self.value_module.is_some()
    }

    /// Current value estimates, without gradient. All zeros without a value module.
    pub fn values(&self, observations: &[Vec<f32>]) -> Result<Vec<f32>> {
        let Some(value_module) = &self.value_module else {
            return Ok(vec![0.; observations.len()]);
        };
        if observations.is_empty() {
            return Ok(vec![]);
        }
        let observations = observations_tensor(observations, &self.device)?;
        let values = value_module
            .value_function
            .calculate_values(&observations)?
            .detach();
        Ok(values.to_vec1()?)
    }
}

impl LearningModule for DecoupledActorCriticLM {
    type Losses = PolicyValuesLosses;

    /// Both gradients are taken before either optimizer steps.
    fn update(&mut self, losses: Self::Losses) -> Result<()> {
        let policy_grads = self.policy_optimizer.gradients(&losses.policy_loss)?;
        let value_grads = match (&self.value_module, &losses.value_loss) {
            (Some(value_module), Some(value_loss)) => {
                Some(value_module.optimizer.gradients(value_loss)?)
            }
            _ => None,
        };
        self.policy_optimizer.apply(&policy_grads)?;
        if let (Some(value_module), Some(value_grads)) = (&mut self.value_module, value_grads) {
            value_module.optimizer.apply(&value_grads)?;
        }
        Ok(())
    }
}
