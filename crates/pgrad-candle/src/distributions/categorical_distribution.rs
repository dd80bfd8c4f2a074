use super::Distribution;
use crate::sequential::{Sequential, build_sequential};
use anyhow::Result;
use candle_core::{Device, Tensor, Var};
use candle_nn::{
    Module,
    ops::{log_softmax, softmax},
};
use pgrad_core::{env::Action, error::TrainError, policy::Policy, rng::RNG};
use rand::distr::{Distribution as RandDistribution, weighted::WeightedIndex};

#[derive(Clone, Debug)]
pub struct CategoricalDistribution {
    action_size: usize,
    logits: Sequential,
    device: Device,
}

impl CategoricalDistribution {
    pub fn new(action_size: usize, logits: Sequential, device: Device) -> Self {
        Self {
            action_size,
            logits,
            device,
        }
    }

    /// `layers` are the hidden sizes, the output layer of `action_size` logits is appended.
    pub fn build(
        input_dim: usize,
        action_size: usize,
        layers: &[usize],
        device: &Device,
        prefix: &str,
    ) -> Result<Self> {
        let mut layers = layers.to_vec();
        layers.push(action_size);
        let logits = build_sequential(input_dim, &layers, device, prefix)?;
        Ok(Self::new(action_size, logits, device.clone()))
    }

    fn observation_logits(&self, observation: &[f32]) -> Result<Tensor> {
        let observation = Tensor::from_slice(observation, (1, observation.len()), &self.device)?;
        Ok(self.logits.forward(&observation)?)
    }
}

impl Policy for CategoricalDistribution {
    fn get_action(&self, observation: &[f32]) -> Result<(Action, f32)> {
        let logits = self.observation_logits(observation)?;
        let log_probs: Vec<f32> = log_softmax(&logits, 1)?.squeeze(0)?.to_vec1()?;
        let action_probs: Vec<f32> = softmax(&logits, 1)?.squeeze(0)?.to_vec1()?;
        let distribution = WeightedIndex::new(&action_probs)
            .map_err(|err| TrainError::NonFinite(format!("action probabilities ({err})")))?;
        let action = RNG.with_borrow_mut(|rng| distribution.sample(rng));
        Ok((Action::Discrete(action), log_probs[action]))
    }

    fn greedy_action(&self, observation: &[f32]) -> Result<Action> {
        let logits = self.observation_logits(observation)?;
        let action = logits.squeeze(0)?.argmax(0)?.to_scalar::<u32>()?;
        Ok(Action::Discrete(action as usize))
    }
}

impl Distribution for CategoricalDistribution {
    fn log_probs(&self, observations: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let logits = self.logits.forward(observations)?;
        let log_probs = log_softmax(&logits, 1)?;
        Ok(actions.mul(&log_probs)?.sum(1)?)
    }

    fn entropy(&self, observations: &Tensor) -> Result<Tensor> {
        let logits = self.logits.forward(observations)?;
        let log_probs = log_softmax(&logits, 1)?;
        let probs = log_probs.exp()?;
        Ok(probs.mul(&log_probs)?.sum(1)?.neg()?)
    }

    /// One-hot rows, so that `log_probs` can pick the taken action with a product.
    fn actions_tensor(&self, actions: &[&Action]) -> Result<Tensor> {
        let mut action_mask = vec![0f32; actions.len() * self.action_size];
        for (row, action) in actions.iter().enumerate() {
            match action {
                Action::Discrete(idx) if *idx < self.action_size => {
                    action_mask[row * self.action_size + idx] = 1.;
                }
                Action::Discrete(idx) => {
                    return Err(TrainError::DimensionMismatch {
                        expected: self.action_size,
                        actual: *idx,
                    }
                    .into());
                }
                Action::Continuous(_) => {
                    return Err(TrainError::UnsupportedActionSpace(
                        "continuous action fed to a categorical distribution".to_owned(),
                    )
                    .into());
                }
            }
        }
        Ok(Tensor::from_vec(
            action_mask,
            (actions.len(), self.action_size),
            &self.device,
        )?)
    }

    fn vars(&self) -> Vec<Var> {
        self.logits.vars()
    }
}

#[cfg(test)]
mod test {
    use super::CategoricalDistribution;
    use crate::distributions::Distribution;
    use anyhow::Result;
    use approx::assert_relative_eq;
    use candle_core::{Device, Tensor};
    use pgrad_core::{env::Action, policy::Policy, rng};

    #[test]
    fn sampled_actions_stay_in_range() -> Result<()> {
        rng::set_seed(3);
        let dist = CategoricalDistribution::build(2, 3, &[16], &Device::Cpu, "policy")?;
        for i in 0..200 {
            let (action, logp) = dist.get_action(&[i as f32 * 0.1, -1.])?;
            let Action::Discrete(idx) = action else {
                panic!("expected a discrete action");
            };
            assert!(idx < 3);
            assert!(logp <= 0.);
        }
        Ok(())
    }

    #[test]
    fn sampled_logp_matches_log_probs() -> Result<()> {
        rng::set_seed(5);
        let dist = CategoricalDistribution::build(2, 4, &[8], &Device::Cpu, "policy")?;
        let observation = [0.3, -0.7];
        let (action, logp) = dist.get_action(&observation)?;
        let observations = Tensor::from_slice(&observation, (1, 2), &Device::Cpu)?;
        let actions = dist.actions_tensor(&[&action])?;
        let log_probs = dist.log_probs(&observations, &actions)?.to_vec1::<f32>()?;
        assert_relative_eq!(log_probs[0], logp, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn entropy_is_bounded_by_uniform() -> Result<()> {
        rng::set_seed(1);
        let dist = CategoricalDistribution::build(1, 5, &[4], &Device::Cpu, "policy")?;
        let observations = Tensor::from_slice(&[0.5f32, -2., 3.], (3, 1), &Device::Cpu)?;
        for entropy in dist.entropy(&observations)?.to_vec1::<f32>()? {
            assert!(entropy >= 0.);
            assert!(entropy <= 5f32.ln() + 1e-5);
        }
        Ok(())
    }

    #[test]
    fn out_of_range_action_is_rejected() -> Result<()> {
        let dist = CategoricalDistribution::build(1, 2, &[], &Device::Cpu, "policy")?;
        assert!(dist.actions_tensor(&[&Action::Discrete(2)]).is_err());
        assert!(dist.actions_tensor(&[&Action::Continuous(vec![0.])]).is_err());
        Ok(())
    }
}
