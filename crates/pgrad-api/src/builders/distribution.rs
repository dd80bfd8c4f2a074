use anyhow::Result;
use candle_core::Device;
use pgrad_candle::distributions::{
    DistributionKind, categorical_distribution::CategoricalDistribution,
    diagonal_distribution::DiagGaussianDistribution,
};
use pgrad_core::{
    env::{ActionSpace, EnvironmentDescription},
    error::TrainError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionType {
    /// Picked from the action space.
    Dynamic,
    CategoricalDistribution,
    DiagGaussianDistribution,
}

#[derive(Debug, Clone)]
pub struct DistributionBuilder {
    pub hidden_layers: Vec<usize>,
    pub distribution_type: DistributionType,
}

impl Default for DistributionBuilder {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 64],
            distribution_type: DistributionType::Dynamic,
        }
    }
}

impl DistributionBuilder {
    pub fn build(
        &self,
        device: &Device,
        env_description: &EnvironmentDescription,
    ) -> Result<DistributionKind> {
        let action_space = env_description.resolve_action_space()?;
        let observation_size = env_description.observation_size();
        if observation_size == 0 {
            return Err(TrainError::InvalidConfig("empty observation space".to_owned()).into());
        }
        let layers = &self.hidden_layers;
        match (self.distribution_type, &action_space) {
            (DistributionType::Dynamic, action_space) => {
                DistributionKind::build(observation_size, action_space, layers, device)
            }
            (DistributionType::CategoricalDistribution, ActionSpace::Discrete(action_size)) => {
                Ok(DistributionKind::Categorical(CategoricalDistribution::build(
                    observation_size,
                    *action_size,
                    layers,
                    device,
                    "policy",
                )?))
            }
            (DistributionType::DiagGaussianDistribution, ActionSpace::ContinuousBox { dims, .. }) => {
                Ok(DistributionKind::DiagGaussian(DiagGaussianDistribution::build(
                    observation_size,
                    *dims,
                    layers,
                    device,
                    "policy",
                )?))
            }
            (distribution_type, action_space) => Err(TrainError::UnsupportedActionSpace(format!(
                "{distribution_type:?} cannot act in {action_space:?}"
            ))
            .into()),
        }
    }
}
