use crate::sequential::{Sequential, build_sequential};
use anyhow::Result;
use candle_core::{Device, Tensor, Var};
use candle_nn::Module;

pub trait ValueFunction {
    /// `(N, obs_dim)` observations to `(N,)` state values.
    fn calculate_values(&self, observations: &Tensor) -> Result<Tensor>;
}

#[derive(Debug, Clone)]
pub struct SequentialValueFunction {
    pub value_net: Sequential,
}

impl SequentialValueFunction {
    pub fn build(input_dim: usize, hidden_layers: &[usize], device: &Device) -> Result<Self> {
        let mut layers = hidden_layers.to_vec();
        layers.push(1);
        let value_net = build_sequential(input_dim, &layers, device, "value")?;
        Ok(Self { value_net })
    }

    pub fn vars(&self) -> Vec<Var> {
        self.value_net.vars()
    }
}

impl ValueFunction for SequentialValueFunction {
    fn calculate_values(&self, observations: &Tensor) -> Result<Tensor> {
        Ok(self.value_net.forward(observations)?.squeeze(1)?)
    }
}
