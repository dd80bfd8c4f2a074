use crate::distributions::Distribution;
use anyhow::Result;
use candle_core::{Device, Tensor};
use pgrad_core::{error::TrainError, trace::Trace};

/// Stacks equally sized observations into an `(N, obs_dim)` tensor.
pub fn observations_tensor(observations: &[Vec<f32>], device: &Device) -> Result<Tensor> {
    let obs_dim = observations.first().map(Vec::len).unwrap_or_default();
    let mut flat = Vec::with_capacity(observations.len() * obs_dim);
    for observation in observations {
        if observation.len() != obs_dim {
            return Err(TrainError::DimensionMismatch {
                expected: obs_dim,
                actual: observation.len(),
            }
            .into());
        }
        flat.extend_from_slice(observation);
    }
    Ok(Tensor::from_vec(flat, (observations.len(), obs_dim), device)?)
}

/// Every step of an epoch's traces flattened into one batch.
#[derive(Debug)]
pub struct RolloutBatch {
    pub observations: Tensor,
    pub actions: Tensor,
    pub returns: Tensor,
    pub advantages: Tensor,
}

impl RolloutBatch {
    /// `returns` and `advantages` hold one vector per trace, aligned with the trace's steps.
    pub fn new<D: Distribution + ?Sized>(
        traces: &[Trace],
        returns: &[Vec<f32>],
        advantages: &[Vec<f32>],
        distribution: &D,
        device: &Device,
    ) -> Result<Self> {
        let steps: usize = traces.iter().map(Trace::len).sum();
        if steps == 0 {
            return Err(TrainError::InvalidConfig("epoch collected no steps".to_owned()).into());
        }
        for (trace, (ret, adv)) in traces.iter().zip(returns.iter().zip(advantages.iter())) {
            for len in [ret.len(), adv.len()] {
                if len != trace.len() {
                    return Err(TrainError::DimensionMismatch {
                        expected: trace.len(),
                        actual: len,
                    }
                    .into());
                }
            }
        }
        let observations: Vec<Vec<f32>> = traces
            .iter()
            .flat_map(|trace| trace.step_observations().iter().cloned())
            .collect();
        let actions: Vec<_> = traces.iter().flat_map(|trace| trace.actions.iter()).collect();
        let returns: Vec<f32> = returns.iter().flatten().copied().collect();
        let advantages: Vec<f32> = advantages.iter().flatten().copied().collect();
        for len in [returns.len(), advantages.len()] {
            if len != steps {
                return Err(TrainError::DimensionMismatch {
                    expected: steps,
                    actual: len,
                }
                .into());
            }
        }
        Ok(Self {
            observations: observations_tensor(&observations, device)?,
            actions: distribution.actions_tensor(&actions)?,
            returns: Tensor::from_vec(returns, steps, device)?,
            advantages: Tensor::from_vec(advantages, steps, device)?,
        })
    }

    pub fn len(&self) -> usize {
        self.returns.dims1().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
