use crate::{
    batch::RolloutBatch,
    distributions::Distribution,
    tensors::{Logps, PolicyLoss, ValueLoss, ValuesPred},
    value_function::ValueFunction,
};
use anyhow::Result;
use candle_core::Tensor;

/// `-mean(logp * A) - entropy_factor * mean(H)`. The advantages carry no gradient.
pub fn policy_loss(
    logps: &Logps,
    advantages: &Tensor,
    entropy: Option<(&Tensor, f32)>,
) -> Result<PolicyLoss> {
    let pg_loss = advantages.detach().mul(logps)?.neg()?.mean_all()?;
    let loss = match entropy {
        Some((entropy, entropy_factor)) => {
            pg_loss.sub(&entropy.mean_all()?.affine(entropy_factor as f64, 0.)?)?
        }
        None => pg_loss,
    };
    Ok(PolicyLoss(loss))
}

/// Mean squared error between value predictions and detached targets.
pub fn value_loss(values_pred: &ValuesPred, targets: &Tensor) -> Result<ValueLoss> {
    Ok(ValueLoss(
        targets.detach().sub(values_pred)?.sqr()?.mean_all()?,
    ))
}

/// Builds the losses of one epoch from its flattened batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectiveBuilder {
    pub entropy_factor: Option<f32>,
}

impl ObjectiveBuilder {
    pub fn policy_loss<D: Distribution + ?Sized>(
        &self,
        distribution: &D,
        batch: &RolloutBatch,
    ) -> Result<PolicyLoss> {
        let logps = Logps(distribution.log_probs(&batch.observations, &batch.actions)?);
        match self.entropy_factor {
            Some(entropy_factor) => {
                let entropy = distribution.entropy(&batch.observations)?;
                policy_loss(&logps, &batch.advantages, Some((&entropy, entropy_factor)))
            }
            None => policy_loss(&logps, &batch.advantages, None),
        }
    }

    pub fn value_loss<V: ValueFunction + ?Sized>(
        &self,
        value_function: &V,
        batch: &RolloutBatch,
    ) -> Result<ValueLoss> {
        let values_pred = ValuesPred(value_function.calculate_values(&batch.observations)?);
        value_loss(&values_pred, &batch.returns)
    }
}
