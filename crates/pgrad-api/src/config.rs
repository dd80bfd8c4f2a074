use anyhow::Result;
use pgrad_candle::optimizer::OptimizerKind;
use pgrad_core::{early_stopping::EarlyStoppingConfig, error::TrainError};
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    Reinforce,
    AcBootstrap,
}

impl FromStr for AlgorithmKind {
    type Err = TrainError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "reinforce" => Ok(Self::Reinforce),
            "ac_bootstrap" => Ok(Self::AcBootstrap),
            _ => Err(TrainError::UnknownAlgorithm(name.to_owned())),
        }
    }
}

/// Early stopping section of the configuration. Present means enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyStoppingSettings {
    pub window: usize,
    pub convergence_threshold: f32,
    pub min_improvement: Option<f32>,
    pub target_return: Option<f32>,
    pub eval_episodes: usize,
    pub eval_interval: usize,
}

impl Default for EarlyStoppingSettings {
    fn default() -> Self {
        EarlyStoppingConfig::default().into()
    }
}

impl From<EarlyStoppingConfig> for EarlyStoppingSettings {
    fn from(config: EarlyStoppingConfig) -> Self {
        Self {
            window: config.window,
            convergence_threshold: config.convergence_threshold,
            min_improvement: config.min_improvement,
            target_return: config.target_return,
            eval_episodes: config.eval_episodes,
            eval_interval: config.eval_interval,
        }
    }
}

impl From<&EarlyStoppingSettings> for EarlyStoppingConfig {
    fn from(settings: &EarlyStoppingSettings) -> Self {
        Self {
            window: settings.window,
            convergence_threshold: settings.convergence_threshold,
            min_improvement: settings.min_improvement,
            target_return: settings.target_return,
            eval_episodes: settings.eval_episodes,
            eval_interval: settings.eval_interval,
        }
    }
}

/// Everything a training run is parameterized by. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// `reinforce` or `ac_bootstrap`.
    pub algorithm: String,
    pub traces: usize,
    /// Segment length for actor-critic, episode step cap for REINFORCE.
    pub trace_len: usize,
    pub epochs: usize,
    pub n: usize,
    pub gamma: f32,
    pub baseline: bool,
    pub entropy: bool,
    pub entropy_factor: f32,
    pub early_stopping: Option<EarlyStoppingSettings>,
    pub optimizer: String,
    pub optim_lr: f64,
    pub optimizer_v: String,
    pub optim_lr_v: f64,
    pub hidden_layers: Vec<usize>,
    pub max_grad_norm: Option<f32>,
    pub seed: u64,
    pub repetitions: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            algorithm: "reinforce".to_owned(),
            traces: 5,
            trace_len: 500,
            epochs: 1000,
            n: 10,
            gamma: 0.99,
            baseline: false,
            entropy: false,
            entropy_factor: 0.2,
            early_stopping: None,
            optimizer: "adam".to_owned(),
            optim_lr: 1e-3,
            optimizer_v: "adam".to_owned(),
            optim_lr_v: 1e-3,
            hidden_layers: vec![64, 64],
            max_grad_norm: None,
            seed: 0,
            repetitions: 1,
        }
    }
}

fn invalid(msg: impl Into<String>) -> anyhow::Error {
    TrainError::InvalidConfig(msg.into()).into()
}

impl TrainingConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| invalid(format!("malformed config: {err}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn algorithm_kind(&self) -> Result<AlgorithmKind> {
        Ok(self.algorithm.parse()?)
    }

    pub fn policy_optimizer(&self) -> Result<OptimizerKind> {
        Ok(self.optimizer.parse()?)
    }

    pub fn value_optimizer(&self) -> Result<OptimizerKind> {
        Ok(self.optimizer_v.parse()?)
    }

    /// The value module exists for actor-critic and for REINFORCE with a baseline.
    pub fn needs_value_module(&self) -> Result<bool> {
        Ok(self.baseline || self.algorithm_kind()? == AlgorithmKind::AcBootstrap)
    }

    pub fn entropy_factor(&self) -> Option<f32> {
        self.entropy.then_some(self.entropy_factor)
    }

    pub fn early_stopping_config(&self) -> Option<EarlyStoppingConfig> {
        self.early_stopping.as_ref().map(EarlyStoppingConfig::from)
    }

    /// Rejects anything that would fail later, before an environment is built.
    pub fn validate(&self) -> Result<()> {
        self.algorithm_kind()?;
        self.policy_optimizer()?;
        if self.needs_value_module()? {
            self.value_optimizer()?;
        }
        if !(self.gamma > 0. && self.gamma <= 1.) {
            return Err(invalid(format!("gamma must be in (0, 1], got {}", self.gamma)));
        }
        for (name, value) in [
            ("traces", self.traces),
            ("trace_len", self.trace_len),
            ("epochs", self.epochs),
            ("n", self.n),
            ("repetitions", self.repetitions),
        ] {
            if value == 0 {
                return Err(invalid(format!("{name} must be at least 1")));
            }
        }
        if self.hidden_layers.contains(&0) {
            return Err(invalid("hidden layers must not be empty"));
        }
        for (name, lr) in [("optim_lr", self.optim_lr), ("optim_lr_v", self.optim_lr_v)] {
            if !(lr.is_finite() && lr > 0.) {
                return Err(invalid(format!("{name} must be positive, got {lr}")));
            }
        }
        if self.entropy && !(self.entropy_factor.is_finite() && self.entropy_factor >= 0.) {
            return Err(invalid("entropy_factor must be a non-negative number"));
        }
        if self
            .max_grad_norm
            .is_some_and(|max_grad_norm| !(max_grad_norm.is_finite() && max_grad_norm > 0.))
        {
            return Err(invalid("max_grad_norm must be positive"));
        }
        if let Some(early_stopping) = &self.early_stopping {
            if early_stopping.window == 0 {
                return Err(invalid("early stopping window must be at least 1"));
            }
            if early_stopping.target_return.is_some()
                && (early_stopping.eval_episodes == 0 || early_stopping.eval_interval == 0)
            {
                return Err(invalid(
                    "target return needs eval_episodes and eval_interval of at least 1",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{AlgorithmKind, TrainingConfig};
    use pgrad_core::error::TrainError;

    fn config_error(config: &TrainingConfig) -> Option<TrainError> {
        config
            .validate()
            .err()
            .and_then(|err| err.downcast_ref::<TrainError>().cloned())
    }

    #[test]
    fn defaults_are_valid() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.algorithm_kind().ok(), Some(AlgorithmKind::Reinforce));
        assert_eq!(config.entropy_factor(), None);
        assert!(config.early_stopping_config().is_none());
    }

    #[test]
    fn partial_json_fills_defaults() -> anyhow::Result<()> {
        let config = TrainingConfig::from_json(
            r#"{"algorithm": "AC_bootstrap", "entropy": true, "early_stopping": {"window": 20}}"#,
        )?;
        assert_eq!(config.algorithm_kind()?, AlgorithmKind::AcBootstrap);
        assert_eq!(config.traces, 5);
        assert_eq!(config.entropy_factor(), Some(0.2));
        let early_stopping = config.early_stopping_config().expect("early stopping configured");
        assert_eq!(early_stopping.window, 20);
        assert_eq!(early_stopping.eval_episodes, 5);
        assert!(config.needs_value_module()?);
        Ok(())
    }

    #[test]
    fn unknown_names_are_rejected() {
        let config = TrainingConfig {
            algorithm: "ppo".to_owned(),
            ..Default::default()
        };
        assert_eq!(
            config_error(&config),
            Some(TrainError::UnknownAlgorithm("ppo".to_owned()))
        );
        let config = TrainingConfig {
            optimizer: "adagrad".to_owned(),
            ..Default::default()
        };
        assert_eq!(
            config_error(&config),
            Some(TrainError::UnknownOptimizer("adagrad".to_owned()))
        );
    }

    #[test]
    fn value_optimizer_only_checked_when_used() {
        let config = TrainingConfig {
            optimizer_v: "adagrad".to_owned(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let config = TrainingConfig {
            baseline: true,
            ..config
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for config in [
            TrainingConfig {
                gamma: 0.,
                ..Default::default()
            },
            TrainingConfig {
                gamma: 1.5,
                ..Default::default()
            },
            TrainingConfig {
                traces: 0,
                ..Default::default()
            },
            TrainingConfig {
                n: 0,
                ..Default::default()
            },
            TrainingConfig {
                optim_lr: -1.,
                ..Default::default()
            },
            TrainingConfig {
                hidden_layers: vec![64, 0],
                ..Default::default()
            },
        ] {
            assert!(matches!(
                config_error(&config),
                Some(TrainError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = TrainingConfig::from_json("{\"traces\": -3}").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrainError>(),
            Some(TrainError::InvalidConfig(_))
        ));
    }
}
