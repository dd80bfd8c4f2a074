use super::Distribution;
use crate::sequential::{Sequential, build_sequential};
use anyhow::Result;
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::Module;
use pgrad_core::{env::Action, error::TrainError, policy::Policy, rng::RNG};
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;

fn log_sqrt_2pi() -> f64 {
    f64::ln(f64::sqrt(2. * PI))
}

/// Gaussian with a state dependent mean and a learned, state independent log standard deviation
/// per action dimension.
#[derive(Debug, Clone)]
pub struct DiagGaussianDistribution {
    mu_net: Sequential,
    log_std: Var,
    device: Device,
}

impl DiagGaussianDistribution {
    pub fn new(mu_net: Sequential, log_std: Var, device: Device) -> Self {
        Self {
            mu_net,
            log_std,
            device,
        }
    }

    /// The log standard deviation starts at zero, a unit variance.
    pub fn build(
        input_dim: usize,
        action_size: usize,
        layers: &[usize],
        device: &Device,
        prefix: &str,
    ) -> Result<Self> {
        let mut layers = layers.to_vec();
        layers.push(action_size);
        let mu_net = build_sequential(input_dim, &layers, device, prefix)?;
        let log_std = Var::zeros(action_size, DType::F32, device)?;
        Ok(Self::new(mu_net, log_std, device.clone()))
    }

    pub fn std(&self) -> Result<f32> {
        Ok(self.log_std.exp()?.mean_all()?.to_scalar::<f32>()?)
    }

    fn observation_mu(&self, observation: &[f32]) -> Result<Vec<f32>> {
        let observation = Tensor::from_slice(observation, (1, observation.len()), &self.device)?;
        Ok(self.mu_net.forward(&observation)?.squeeze(0)?.to_vec1()?)
    }
}

impl Policy for DiagGaussianDistribution {
    fn get_action(&self, observation: &[f32]) -> Result<(Action, f32)> {
        let mu = self.observation_mu(observation)?;
        let log_std: Vec<f32> = self.log_std.to_vec1()?;
        let noise: Vec<f32> = RNG.with_borrow_mut(|rng| {
            (0..mu.len())
                .map(|_| rng.sample::<f32, _>(StandardNormal))
                .collect()
        });
        let mut logp = 0f32;
        let mut action = Vec::with_capacity(mu.len());
        for ((mu, log_std), noise) in mu.iter().zip(log_std.iter()).zip(noise.iter()) {
            action.push(mu + log_std.exp() * noise);
            logp += -0.5 * noise * noise - log_std - log_sqrt_2pi() as f32;
        }
        if !logp.is_finite() {
            return Err(TrainError::NonFinite("gaussian log-probability".to_owned()).into());
        }
        Ok((Action::Continuous(action), logp))
    }

    fn greedy_action(&self, observation: &[f32]) -> Result<Action> {
        Ok(Action::Continuous(self.observation_mu(observation)?))
    }
}

impl Distribution for DiagGaussianDistribution {
    fn log_probs(&self, observations: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let mu = self.mu_net.forward(observations)?;
        let log_std = self.log_std.broadcast_as(mu.shape())?;
        let var = log_std.affine(2., 0.)?.exp()?;
        let log_probs = actions
            .sub(&mu)?
            .sqr()?
            .div(&var.affine(2., 0.)?)?
            .neg()?
            .sub(&log_std)?
            .affine(1., -log_sqrt_2pi())?;
        Ok(log_probs.sum(1)?)
    }

    /// Does not depend on the observation, the value is repeated once per row.
    fn entropy(&self, observations: &Tensor) -> Result<Tensor> {
        let rows = observations.dim(0)?;
        let entropy = self
            .log_std
            .affine(1., 0.5 * ((2. * PI).ln() + 1.))?
            .sum_all()?;
        Ok(entropy.broadcast_as(rows)?)
    }

    fn actions_tensor(&self, actions: &[&Action]) -> Result<Tensor> {
        let action_size = self.log_std.dim(0)?;
        let mut flat = Vec::with_capacity(actions.len() * action_size);
        for action in actions {
            match action {
                Action::Continuous(values) if values.len() == action_size => {
                    flat.extend_from_slice(values)
                }
                Action::Continuous(values) => {
                    return Err(TrainError::DimensionMismatch {
                        expected: action_size,
                        actual: values.len(),
                    }
                    .into());
                }
                Action::Discrete(_) => {
                    return Err(TrainError::UnsupportedActionSpace(
                        "discrete action fed to a gaussian distribution".to_owned(),
                    )
                    .into());
                }
            }
        }
        Ok(Tensor::from_vec(
            flat,
            (actions.len(), action_size),
            &self.device,
        )?)
    }

    fn vars(&self) -> Vec<Var> {
        let mut vars = self.mu_net.vars();
        vars.push(self.log_std.clone());
        vars
    }
}
