use crate::{
    builders::{
        distribution::DistributionBuilder,
        learning_module::{LearningModuleBuilder, OptimizerSettings, ValueModuleSettings},
    },
    config::{AlgorithmKind, TrainingConfig},
};
use anyhow::Result;
use candle_core::Device;
use pgrad_agents::{
    AgentKind, Trainer, TrainingState,
    actor_critic::ActorCritic,
    on_policy_algorithm::{DefaultOnPolicyAlgorithmHooks, LearningSchedule, OnPolicyAlgorithm},
    reinforce::Reinforce,
};
use pgrad_core::{
    early_stopping::{EarlyStoppingConfig, EarlyStoppingMonitor},
    env::{Env, EnvBuilderTrait},
};
use tracing::debug;

pub type DefaultOnPolicyAlgorithm<E> =
    OnPolicyAlgorithm<E, AgentKind, DefaultOnPolicyAlgorithmHooks>;

pub struct OnPolicyAlgorithmBuilder {
    pub agent: AgentKind,
    pub distribution_builder: DistributionBuilder,
    pub learning_module_builder: LearningModuleBuilder,
    pub learning_schedule: LearningSchedule,
    pub early_stopping: Option<EarlyStoppingConfig>,
    /// Step cap for greedy evaluation episodes.
    pub eval_max_steps: Option<usize>,
    pub device: Device,
}

impl OnPolicyAlgorithmBuilder {
    pub fn reinforce() -> Self {
        Self {
            agent: AgentKind::Reinforce(Reinforce::default()),
            distribution_builder: DistributionBuilder::default(),
            learning_module_builder: LearningModuleBuilder::default(),
            learning_schedule: LearningSchedule::epoch_bound(1000),
            early_stopping: None,
            eval_max_steps: Some(500),
            device: Device::Cpu,
        }
    }

    pub fn ac_bootstrap() -> Self {
        Self {
            agent: AgentKind::ActorCritic(ActorCritic::default()),
            learning_module_builder: LearningModuleBuilder {
                value_module: Some(ValueModuleSettings::default()),
                ..Default::default()
            },
            ..Self::reinforce()
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Result<Self> {
        config.validate()?;
        let entropy_factor = config.entropy_factor();
        let agent = match config.algorithm_kind()? {
            AlgorithmKind::Reinforce => AgentKind::Reinforce(Reinforce {
                gamma: config.gamma,
                traces: config.traces,
                max_episode_steps: Some(config.trace_len),
                baseline: config.baseline,
                entropy_factor,
            }),
            AlgorithmKind::AcBootstrap => AgentKind::ActorCritic(ActorCritic {
                gamma: config.gamma,
                traces: config.traces,
                trace_len: config.trace_len,
                n: config.n,
                baseline: config.baseline,
                entropy_factor,
            }),
        };
        let value_module = if config.needs_value_module()? {
            Some(ValueModuleSettings {
                hidden_layers: config.hidden_layers.clone(),
                optimizer: OptimizerSettings {
                    kind: config.value_optimizer()?,
                    lr: config.optim_lr_v,
                },
            })
        } else {
            None
        };
        Ok(Self {
            agent,
            distribution_builder: DistributionBuilder {
                hidden_layers: config.hidden_layers.clone(),
                ..Default::default()
            },
            learning_module_builder: LearningModuleBuilder {
                policy_optimizer: OptimizerSettings {
                    kind: config.policy_optimizer()?,
                    lr: config.optim_lr,
                },
                value_module,
                max_grad_norm: config.max_grad_norm,
            },
            learning_schedule: LearningSchedule::epoch_bound(config.epochs),
            early_stopping: config.early_stopping_config(),
            eval_max_steps: Some(config.trace_len),
            device: Device::Cpu,
        })
    }

    pub fn set_learning_schedule(&mut self, learning_schedule: LearningSchedule) {
        self.learning_schedule = learning_schedule;
    }

    pub fn set_early_stopping(&mut self, early_stopping: Option<EarlyStoppingConfig>) {
        self.early_stopping = early_stopping;
    }

    /// Builds the environment and fresh modules. The action space and the module layout are
    /// checked here, no environment step happens before `train`.
    pub fn build<EB: EnvBuilderTrait>(
        &self,
        env_builder: &EB,
    ) -> Result<DefaultOnPolicyAlgorithm<EB::Env>> {
        let monitor = self
            .early_stopping
            .clone()
            .map(EarlyStoppingMonitor::new)
            .transpose()?;
        let env = env_builder.build_env()?;
        let env_description = env.env_description();
        let distribution = self
            .distribution_builder
            .build(&self.device, &env_description)?;
        let learning_module =
            self.learning_module_builder
                .build(distribution, &env_description, &self.device)?;
        let state = TrainingState::new(learning_module);
        self.agent.validate(&state)?;
        let mut hooks = DefaultOnPolicyAlgorithmHooks::new(self.learning_schedule)
            .with_eval_max_steps(self.eval_max_steps);
        if let Some(monitor) = monitor {
            hooks = hooks.with_early_stopping(monitor);
        }
        debug!(
            observation_size = env_description.observation_size(),
            action_size = env_description.action_size(),
            "on-policy algorithm built"
        );
        Ok(OnPolicyAlgorithm::new(env, self.agent.clone(), hooks, state))
    }
}
