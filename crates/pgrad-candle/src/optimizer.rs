use anyhow::Result;
use candle_core::{Tensor, Var, backprop::GradStore};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, SGD};
use pgrad_core::error::TrainError;
use std::{fmt::Debug, str::FromStr};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Adam,
    Sgd,
    RmsProp,
}

impl FromStr for OptimizerKind {
    type Err = TrainError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "adam" => Ok(Self::Adam),
            "sgd" => Ok(Self::Sgd),
            "rms" | "rmsprop" => Ok(Self::RmsProp),
            _ => Err(TrainError::UnknownOptimizer(name.to_owned())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParamsRmsProp {
    pub lr: f64,
    pub alpha: f64,
    pub eps: f64,
}

impl Default for ParamsRmsProp {
    fn default() -> Self {
        Self {
            lr: 0.01,
            alpha: 0.99,
            eps: 1e-8,
        }
    }
}

#[derive(Debug)]
struct VarRmsProp {
    var: Var,
    square_avg: Var,
}

#[derive(Debug)]
pub struct RmsProp {
    vars: Vec<VarRmsProp>,
    params: ParamsRmsProp,
}

impl Optimizer for RmsProp {
    type Config = ParamsRmsProp;

    fn new(vars: Vec<Var>, params: ParamsRmsProp) -> candle_core::Result<Self> {
        let vars = vars
            .into_iter()
            .filter(|var| var.dtype().is_float())
            .map(|var| {
                let square_avg = Var::zeros(var.shape(), var.dtype(), var.device())?;
                Ok(VarRmsProp { var, square_avg })
            })
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Self { vars, params })
    }

    fn learning_rate(&self) -> f64 {
        self.params.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.params.lr = lr
    }

    fn step(&mut self, grads: &GradStore) -> candle_core::Result<()> {
        let alpha = self.params.alpha;
        for var in self.vars.iter() {
            let theta = &var.var;
            let v = &var.square_avg;
            if let Some(g) = grads.get(theta) {
                let next_v = ((v.as_tensor() * alpha)? + (g.sqr()? * (1. - alpha))?)?;
                let step = (g / (next_v.sqrt()? + self.params.eps)?)?;
                let next_theta = (theta.as_tensor() - (step * self.params.lr)?)?;
                v.set(&next_v)?;
                theta.set(&next_theta)?;
            }
        }
        Ok(())
    }
}

/// One of the supported update rules, picked from the configuration by name.
pub enum ParamOptimizer {
    Adam(AdamW),
    Sgd(SGD),
    RmsProp(RmsProp),
}

impl Debug for ParamOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Adam(_) => "Adam",
            Self::Sgd(_) => "Sgd",
            Self::RmsProp(_) => "RmsProp",
        };
        f.debug_struct(name)
            .field("lr", &self.learning_rate())
            .finish()
    }
}

impl ParamOptimizer {
    pub fn new(kind: OptimizerKind, vars: Vec<Var>, lr: f64) -> Result<Self> {
        let optimizer = match kind {
            OptimizerKind::Adam => Self::Adam(AdamW::new(
                vars,
                ParamsAdamW {
                    lr,
                    weight_decay: 0.,
                    ..Default::default()
                },
            )?),
            OptimizerKind::Sgd => Self::Sgd(SGD::new(vars, lr)?),
            OptimizerKind::RmsProp => Self::RmsProp(RmsProp::new(
                vars,
                ParamsRmsProp {
                    lr,
                    ..Default::default()
                },
            )?),
        };
        Ok(optimizer)
    }

    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match self {
            Self::Adam(opt) => opt.step(grads)?,
            Self::Sgd(opt) => opt.step(grads)?,
            Self::RmsProp(opt) => opt.step(grads)?,
        }
        Ok(())
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            Self::Adam(opt) => opt.learning_rate(),
            Self::Sgd(opt) => opt.learning_rate(),
            Self::RmsProp(opt) => opt.learning_rate(),
        }
    }
}

/// L2 norm of the gradients of `vars`, then rescales them in place when a `max_norm` is
/// given and exceeded. Returns the norm before clipping.
pub fn clip_grad(grad_store: &mut GradStore, vars: &[Var], max_norm: Option<f32>) -> Result<f32> {
    let mut total_norm_squared = 0.0f32;
    for var in vars.iter() {
        if let Some(grad) = grad_store.get(var.as_tensor()) {
            total_norm_squared += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
        }
    }
    let total_norm = total_norm_squared.sqrt();
    let Some(max_norm) = max_norm else {
        return Ok(total_norm);
    };
    if total_norm > max_norm {
        let clip_coef = (max_norm / (total_norm + 1e-6)) as f64;
        for var in vars.iter() {
            if let Some(old_grad) = grad_store.get(var.as_tensor()) {
                let new_grad = old_grad.affine(clip_coef, 0.)?;
                grad_store.insert(var.as_tensor(), new_grad);
            }
        }
    }
    Ok(total_norm)
}

/// An optimizer together with the parameters it owns and an optional gradient norm ceiling.
///
/// Computing gradients and applying them are separate steps, so that several losses can be
/// differentiated against the same parameter values before any of them changes.
pub struct OptimizerWithMaxGrad {
    pub optimizer: ParamOptimizer,
    pub max_grad_norm: Option<f32>,
    vars: Vec<Var>,
}

impl Debug for OptimizerWithMaxGrad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerWithMaxGrad")
            .field("optimizer", &self.optimizer)
            .field("max_grad_norm", &self.max_grad_norm)
            .finish()
    }
}

impl OptimizerWithMaxGrad {
    pub fn new(
        kind: OptimizerKind,
        vars: Vec<Var>,
        lr: f64,
        max_grad_norm: Option<f32>,
    ) -> Result<Self> {
        let optimizer = ParamOptimizer::new(kind, vars.clone(), lr)?;
        Ok(Self {
            optimizer,
            max_grad_norm,
            vars,
        })
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// Backpropagates `loss` and clips the result. Fails on a non-finite loss or gradient.
    pub fn gradients(&self, loss: &Tensor) -> Result<GradStore> {
        let loss_value = loss.to_scalar::<f32>()?;
        if !loss_value.is_finite() {
            return Err(TrainError::NonFinite(format!("loss ({loss_value})")).into());
        }
        let mut grads = loss.backward()?;
        let grad_norm = clip_grad(&mut grads, &self.vars, self.max_grad_norm)?;
        if !grad_norm.is_finite() {
            return Err(TrainError::NonFinite("gradient norm".to_owned()).into());
        }
        trace!(loss = loss_value, grad_norm, "gradients computed");
        Ok(grads)
    }

    pub fn apply(&mut self, grads: &GradStore) -> Result<()> {
        self.optimizer.step(grads)
    }

    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = self.gradients(loss)?;
        self.apply(&grads)
    }
}

#[cfg(test)]
mod test {
    use super::{OptimizerKind, OptimizerWithMaxGrad, clip_grad};
    use anyhow::Result;
    use approx::assert_relative_eq;
    use candle_core::{Device, Tensor, Var};
    use pgrad_core::error::TrainError;

    #[test]
    fn parses_known_names() {
        assert_eq!("adam".parse(), Ok(OptimizerKind::Adam));
        assert_eq!("SGD".parse(), Ok(OptimizerKind::Sgd));
        assert_eq!("rms".parse(), Ok(OptimizerKind::RmsProp));
        assert_eq!(
            "lbfgs".parse::<OptimizerKind>(),
            Err(TrainError::UnknownOptimizer("lbfgs".into()))
        );
    }

    #[test]
    fn every_optimizer_descends() -> Result<()> {
        for kind in [OptimizerKind::Adam, OptimizerKind::Sgd, OptimizerKind::RmsProp] {
            let x = Var::from_tensor(&Tensor::new(&[3f32], &Device::Cpu)?)?;
            let mut optimizer = OptimizerWithMaxGrad::new(kind, vec![x.clone()], 0.1, None)?;
            for _ in 0..5 {
                let loss = x.as_tensor().sqr()?.sum_all()?;
                optimizer.backward_step(&loss)?;
            }
            let value = x.as_tensor().to_vec1::<f32>()?[0];
            assert!(value < 3., "{kind:?} did not move towards the minimum: {value}");
        }
        Ok(())
    }

    #[test]
    fn clipping_caps_the_norm() -> Result<()> {
        let x = Var::from_tensor(&Tensor::new(&[3f32, 4.], &Device::Cpu)?)?;
        let loss = x.as_tensor().sum_all()?.affine(10., 0.)?;
        let mut grads = loss.backward()?;
        let norm = clip_grad(&mut grads, &[x.clone()], Some(1.))?;
        assert_relative_eq!(norm, 200f32.sqrt(), epsilon = 1e-4);
        let clipped = grads
            .get(x.as_tensor())
            .map(|grad| grad.sqr()?.sum_all()?.to_scalar::<f32>())
            .transpose()?
            .unwrap_or_default();
        assert_relative_eq!(clipped.sqrt(), 1., epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn non_finite_loss_is_an_error() -> Result<()> {
        let x = Var::from_tensor(&Tensor::new(&[1f32], &Device::Cpu)?)?;
        let optimizer = OptimizerWithMaxGrad::new(OptimizerKind::Sgd, vec![x.clone()], 0.1, None)?;
        let loss = x.as_tensor().affine(f64::NAN, 0.)?.sum_all()?;
        let err = optimizer.gradients(&loss).err().expect("non-finite loss");
        assert!(matches!(
            err.downcast_ref::<TrainError>(),
            Some(TrainError::NonFinite(_))
        ));
        Ok(())
    }
}
