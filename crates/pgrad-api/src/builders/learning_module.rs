use anyhow::Result;
use candle_core::Device;
use pgrad_candle::{
    distributions::{Distribution, DistributionKind},
    learning_module::{DecoupledActorCriticLM, ValueModule},
    optimizer::{OptimizerKind, OptimizerWithMaxGrad},
    value_function::SequentialValueFunction,
};
use pgrad_core::env::EnvironmentDescription;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    pub kind: OptimizerKind,
    pub lr: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            kind: OptimizerKind::Adam,
            lr: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueModuleSettings {
    pub hidden_layers: Vec<usize>,
    pub optimizer: OptimizerSettings,
}

impl Default for ValueModuleSettings {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 64],
            optimizer: OptimizerSettings::default(),
        }
    }
}

/// Policy optimizer plus an optional value module, each with its own optimizer.
#[derive(Debug, Clone, Default)]
pub struct LearningModuleBuilder {
    pub policy_optimizer: OptimizerSettings,
    pub value_module: Option<ValueModuleSettings>,
    pub max_grad_norm: Option<f32>,
}

impl LearningModuleBuilder {
    pub fn build(
        &self,
        distribution: DistributionKind,
        env_description: &EnvironmentDescription,
        device: &Device,
    ) -> Result<DecoupledActorCriticLM> {
        let policy_optimizer = OptimizerWithMaxGrad::new(
            self.policy_optimizer.kind,
            distribution.vars(),
            self.policy_optimizer.lr,
            self.max_grad_norm,
        )?;
        let value_module = match &self.value_module {
            Some(settings) => {
                let value_function = SequentialValueFunction::build(
                    env_description.observation_size(),
                    &settings.hidden_layers,
                    device,
                )?;
                let optimizer = OptimizerWithMaxGrad::new(
                    settings.optimizer.kind,
                    value_function.vars(),
                    settings.optimizer.lr,
                    self.max_grad_norm,
                )?;
                Some(ValueModule {
                    value_function,
                    optimizer,
                })
            }
            None => None,
        };
        Ok(DecoupledActorCriticLM {
            distribution,
            policy_optimizer,
            value_module,
            device: device.clone(),
        })
    }
}
