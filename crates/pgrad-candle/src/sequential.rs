use candle_core::{Device, Result, Tensor, Var};
use candle_nn::{Activation, Linear, Module};
use either::Either;
use pgrad_core::rng::RNG;
use rand::Rng;

// Uniform in [-bound, bound), drawn from the run's generator so that parameter init is seeded too.
fn seeded_uniform(len: usize, bound: f32) -> Vec<f32> {
    RNG.with_borrow_mut(|rng| (0..len).map(|_| rng.random_range(-bound..bound)).collect())
}

#[derive(Debug, Clone)]
pub struct LinearLayer {
    layer: Linear,
    weight: Var,
    bias: Var,
    name: String,
}

impl LinearLayer {
    pub fn new(in_dim: usize, out_dim: usize, device: &Device, name: &str) -> Result<Self> {
        let bound = 1. / (in_dim.max(1) as f32).sqrt();
        let weight = Var::from_tensor(&Tensor::from_vec(
            seeded_uniform(in_dim * out_dim, bound),
            (out_dim, in_dim),
            device,
        )?)?;
        let bias = Var::from_tensor(&Tensor::from_vec(
            seeded_uniform(out_dim, bound),
            out_dim,
            device,
        )?)?;
        let layer = Linear::new(weight.as_tensor().clone(), Some(bias.as_tensor().clone()));
        Ok(Self {
            layer,
            weight,
            bias,
            name: name.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vars(&self) -> [Var; 2] {
        [self.weight.clone(), self.bias.clone()]
    }
}

impl Module for LinearLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.layer.forward(xs)
    }
}

#[derive(Debug, Clone)]
pub struct ActivationLayer(pub Activation);

impl Module for ActivationLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.0.forward(xs)
    }
}

#[derive(Debug, Clone)]
pub struct Layer(pub Either<LinearLayer, ActivationLayer>);

impl Layer {
    pub fn linear(linear: LinearLayer) -> Self {
        Self(Either::Left(linear))
    }

    pub fn activation(activation: ActivationLayer) -> Self {
        Self(Either::Right(activation))
    }
}

impl Module for Layer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match &self.0 {
            Either::Left(linear) => linear.forward(xs),
            Either::Right(activation) => activation.forward(xs),
        }
    }
}

/// Feed-forward network owning its parameters, so that each network gets an optimizer of its own.
#[derive(Default, Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Module for Sequential {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.layers.iter() {
            xs = layer.forward(&xs)?
        }
        Ok(xs)
    }
}

impl Sequential {
    pub fn add_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Trainable parameters in layer order.
    pub fn vars(&self) -> Vec<Var> {
        self.layers
            .iter()
            .filter_map(|layer| layer.0.as_ref().left())
            .flat_map(LinearLayer::vars)
            .collect()
    }
}

/// Linear layers of the given sizes with ReLU in between. The last entry of `layers` is the output
/// size and gets no activation.
pub fn build_sequential(
    input_dim: usize,
    layers: &[usize],
    device: &Device,
    prefix: &str,
) -> Result<Sequential> {
    let mut last_dim = input_dim;
    let mut nn = Sequential::default();
    let num_layers = layers.len();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_name = format!("{prefix}{layer_idx}");
        let lin_layer = LinearLayer::new(last_dim, *layer_size, device, &layer_name)?;
        nn = nn.add_layer(Layer::linear(lin_layer));
        if layer_idx != num_layers - 1 {
            nn = nn.add_layer(Layer::activation(ActivationLayer(Activation::Relu)));
        }
        last_dim = *layer_size;
    }
    Ok(nn)
}
