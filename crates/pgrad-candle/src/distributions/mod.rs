pub mod categorical_distribution;
pub mod diagonal_distribution;

use anyhow::Result;
use candle_core::{Device, Tensor, Var};
use categorical_distribution::CategoricalDistribution;
use diagonal_distribution::DiagGaussianDistribution;
use pgrad_core::{
    env::{Action, ActionSpace},
    policy::Policy,
};

/// The training side of a policy: differentiable log-probabilities and entropies over a batch.
pub trait Distribution: Policy {
    /// `observations` is `(N, obs_dim)`, `actions` comes from [`Distribution::actions_tensor`].
    /// Returns `(N,)`.
    fn log_probs(&self, observations: &Tensor, actions: &Tensor) -> Result<Tensor>;

    /// Per-row entropy of the induced distribution, `(N,)`.
    fn entropy(&self, observations: &Tensor) -> Result<Tensor>;

    fn actions_tensor(&self, actions: &[&Action]) -> Result<Tensor>;

    fn vars(&self) -> Vec<Var>;
}

#[derive(Debug, Clone)]
pub enum DistributionKind {
    Categorical(CategoricalDistribution),
    DiagGaussian(DiagGaussianDistribution),
}

impl DistributionKind {
    /// Categorical head for discrete spaces, diagonal Gaussian head for boxes.
    pub fn build(
        observation_size: usize,
        action_space: &ActionSpace,
        hidden_layers: &[usize],
        device: &Device,
    ) -> Result<Self> {
        match action_space {
            ActionSpace::Discrete(action_size) => {
                Ok(Self::Categorical(CategoricalDistribution::build(
                    observation_size,
                    *action_size,
                    hidden_layers,
                    device,
                    "policy",
                )?))
            }
            ActionSpace::ContinuousBox { dims, .. } => {
                Ok(Self::DiagGaussian(DiagGaussianDistribution::build(
                    observation_size,
                    *dims,
                    hidden_layers,
                    device,
                    "policy",
                )?))
            }
        }
    }
}

impl Policy for DistributionKind {
    fn get_action(&self, observation: &[f32]) -> Result<(Action, f32)> {
        match self {
            Self::Categorical(cat) => cat.get_action(observation),
            Self::DiagGaussian(diag) => diag.get_action(observation),
        }
    }

    fn greedy_action(&self, observation: &[f32]) -> Result<Action> {
        match self {
            Self::Categorical(cat) => cat.greedy_action(observation),
            Self::DiagGaussian(diag) => diag.greedy_action(observation),
        }
    }
}

impl Distribution for DistributionKind {
    fn log_probs(&self, observations: &Tensor, actions: &Tensor) -> Result<Tensor> {
        match self {
            Self::Categorical(cat) => cat.log_probs(observations, actions),
            Self::DiagGaussian(diag) => diag.log_probs(observations, actions),
        }
    }

    fn entropy(&self, observations: &Tensor) -> Result<Tensor> {
        match self {
            Self::Categorical(cat) => cat.entropy(observations),
            Self::DiagGaussian(diag) => diag.entropy(observations),
        }
    }

    fn actions_tensor(&self, actions: &[&Action]) -> Result<Tensor> {
        match self {
            Self::Categorical(cat) => cat.actions_tensor(actions),
            Self::DiagGaussian(diag) => diag.actions_tensor(actions),
        }
    }

    fn vars(&self) -> Vec<Var> {
        match self {
            Self::Categorical(cat) => cat.vars(),
            Self::DiagGaussian(diag) => diag.vars(),
        }
    }
}
