use crate::{EpochReport, Trainer, TrainingState};
use anyhow::{Result, bail};
use pgrad_core::{
    Algorithm,
    early_stopping::{EarlyStoppingMonitor, StopReason},
    env::Env,
    reward_curve::RewardCurve,
    trace::evaluate_greedy,
};
use tracing::{info, warn};

macro_rules! break_on_hook_res {
    ($hook_res:expr) => {
        if $hook_res {
            break;
        }
    };
}

#[derive(Debug, Clone, Copy)]
pub enum LearningSchedule {
    EpochBound {
        total_epochs: usize,
        current_epoch: usize,
    },
    TotalStepBound {
        total_steps: usize,
        current_step: usize,
    },
}

impl LearningSchedule {
    pub fn epoch_bound(total_epochs: usize) -> Self {
        Self::EpochBound {
            total_epochs,
            current_epoch: 0,
        }
    }

    pub fn total_step_bound(total_steps: usize) -> Self {
        Self::TotalStepBound {
            total_steps,
            current_step: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        match self {
            Self::EpochBound {
                total_epochs,
                current_epoch,
            } => current_epoch >= total_epochs,
            Self::TotalStepBound {
                total_steps,
                current_step,
            } => current_step >= total_steps,
        }
    }

    fn advance(&mut self, report: &EpochReport) {
        match self {
            Self::EpochBound { current_epoch, .. } => *current_epoch += 1,
            Self::TotalStepBound { current_step, .. } => *current_step += report.steps,
        }
    }
}

/// Callbacks around the epoch loop. Returning `true` ends training after the current epoch.
pub trait OnPolicyAlgorithmHooks {
    fn init_hook(&mut self, state: &TrainingState) -> Result<bool>;

    fn post_epoch_hook(
        &mut self,
        report: &EpochReport,
        state: &TrainingState,
        env: &mut dyn Env,
    ) -> Result<bool>;

    fn shutdown_hook(&mut self, state: &TrainingState) -> Result<()>;
}

/// Logs every epoch, stops when the schedule runs out or the early-stopping monitor fires.
pub struct DefaultOnPolicyAlgorithmHooks {
    learning_schedule: LearningSchedule,
    early_stopping: Option<EarlyStoppingMonitor>,
    eval_max_steps: Option<usize>,
    stop_reason: Option<StopReason>,
}

impl DefaultOnPolicyAlgorithmHooks {
    pub fn new(learning_schedule: LearningSchedule) -> Self {
        Self {
            learning_schedule,
            early_stopping: None,
            eval_max_steps: None,
            stop_reason: None,
        }
    }

    pub fn with_early_stopping(mut self, monitor: EarlyStoppingMonitor) -> Self {
        self.early_stopping = Some(monitor);
        self
    }

    /// Step cap for the greedy evaluation episodes.
    pub fn with_eval_max_steps(mut self, eval_max_steps: Option<usize>) -> Self {
        self.eval_max_steps = eval_max_steps;
        self
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    fn check_early_stopping(
        &mut self,
        epoch_reward: f32,
        state: &TrainingState,
        env: &mut dyn Env,
    ) -> Result<Option<StopReason>> {
        let Some(monitor) = &mut self.early_stopping else {
            return Ok(None);
        };
        monitor.record(epoch_reward);
        if let Some(reason) = monitor.stop_reason() {
            return Ok(Some(reason));
        }
        if !monitor.evaluation_due() {
            return Ok(None);
        }
        let eval_return = evaluate_greedy(
            state.policy(),
            env,
            monitor.config().eval_episodes,
            self.eval_max_steps,
        )?;
        info!(epoch = state.epoch, eval_return, "greedy evaluation");
        Ok(monitor.target_reached(eval_return))
    }
}

impl OnPolicyAlgorithmHooks for DefaultOnPolicyAlgorithmHooks {
    fn init_hook(&mut self, _state: &TrainingState) -> Result<bool> {
        Ok(self.learning_schedule.is_done())
    }

    fn post_epoch_hook(
        &mut self,
        report: &EpochReport,
        state: &TrainingState,
        env: &mut dyn Env,
    ) -> Result<bool> {
        info!(
            epoch = state.epoch,
            reward = report.epoch_reward,
            traces = report.traces,
            steps = report.steps,
            policy_loss = report.policy_loss,
            value_loss = ?report.value_loss,
            "epoch finished"
        );
        self.learning_schedule.advance(report);
        if self.learning_schedule.is_done() {
            return Ok(true);
        }
        let Some(reason) = self.check_early_stopping(report.epoch_reward, state, env)? else {
            return Ok(false);
        };
        info!(epoch = state.epoch, ?reason, "early stopping");
        self.stop_reason = Some(reason);
        Ok(true)
    }

    fn shutdown_hook(&mut self, state: &TrainingState) -> Result<()> {
        info!(
            epochs = state.epoch,
            final_reward = ?state.reward_curve.last(),
            "training finished"
        );
        Ok(())
    }
}

/// Runs epochs of `agent` on `env` until a hook says stop. One reward per finished epoch is
/// recorded, an interrupted epoch leaves no trace in the curve.
pub struct OnPolicyAlgorithm<E: Env, A: Trainer, H: OnPolicyAlgorithmHooks> {
    pub env: E,
    pub agent: A,
    pub hooks: H,
    state: Option<TrainingState>,
}

impl<E: Env, A: Trainer, H: OnPolicyAlgorithmHooks> OnPolicyAlgorithm<E, A, H> {
    pub fn new(env: E, agent: A, hooks: H, state: TrainingState) -> Self {
        Self {
            env,
            agent,
            hooks,
            state: Some(state),
        }
    }

    pub fn state(&self) -> Option<&TrainingState> {
        self.state.as_ref()
    }

    pub fn into_state(self) -> Option<TrainingState> {
        self.state
    }
}

impl<E: Env, A: Trainer, H: OnPolicyAlgorithmHooks> Algorithm for OnPolicyAlgorithm<E, A, H> {
    fn train(&mut self) -> Result<RewardCurve> {
        let Some(state) = self.state.as_ref() else {
            bail!("training state was dropped by a failed epoch");
        };
        self.agent.validate(state)?;
        let Some(mut state) = self.state.take() else {
            bail!("training state was dropped by a failed epoch");
        };
        if !self.hooks.init_hook(&state)? {
            loop {
                let (next_state, report) = match self.agent.run_epoch(&mut self.env, state) {
                    Ok(next) => next,
                    Err(err) => {
                        warn!(%err, "epoch failed");
                        return Err(err);
                    }
                };
                state = next_state;
                state.epoch += 1;
                state.reward_curve.push(report.epoch_reward);
                break_on_hook_res!(self.hooks.post_epoch_hook(&report, &state, &mut self.env)?);
            }
        }
        self.hooks.shutdown_hook(&state)?;
        let reward_curve = state.reward_curve.clone();
        self.state = Some(state);
        Ok(reward_curve)
    }
}

#[cfg(test)]
mod test {
    use super::{DefaultOnPolicyAlgorithmHooks, LearningSchedule, OnPolicyAlgorithm};
    use crate::{AgentKind, TrainingState, actor_critic::ActorCritic, reinforce::Reinforce};
    use anyhow::Result;
    use candle_core::Device;
    use pgrad_candle::{
        distributions::{Distribution, DistributionKind},
        learning_module::{DecoupledActorCriticLM, ValueModule},
        optimizer::{OptimizerKind, OptimizerWithMaxGrad},
        value_function::SequentialValueFunction,
    };
    use pgrad_core::{
        Algorithm,
        early_stopping::{EarlyStoppingConfig, EarlyStoppingMonitor, StopReason},
        env::Env,
        error::TrainError,
        rng,
    };
    use pgrad_envs::toy::ContextualBandit;

    fn state(env: &impl Env, with_value: bool) -> Result<TrainingState> {
        let device = Device::Cpu;
        let description = env.env_description();
        let action_space = description.resolve_action_space()?;
        let obs_size = description.observation_size();
        let distribution = DistributionKind::build(obs_size, &action_space, &[16], &device)?;
        let policy_optimizer =
            OptimizerWithMaxGrad::new(OptimizerKind::Adam, distribution.vars(), 1e-2, None)?;
        let value_module = if with_value {
            let value_function = SequentialValueFunction::build(obs_size, &[16], &device)?;
            let optimizer =
                OptimizerWithMaxGrad::new(OptimizerKind::Adam, value_function.vars(), 1e-2, None)?;
            Some(ValueModule {
                value_function,
                optimizer,
            })
        } else {
            None
        };
        Ok(TrainingState::new(DecoupledActorCriticLM {
            distribution,
            policy_optimizer,
            value_module,
            device,
        }))
    }

    fn reinforce() -> AgentKind {
        AgentKind::Reinforce(Reinforce {
            traces: 2,
            max_episode_steps: None,
            ..Default::default()
        })
    }

    #[test]
    fn one_reward_per_epoch() -> Result<()> {
        rng::set_seed(0);
        let env = ContextualBandit::default();
        let state = state(&env, false)?;
        let hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::epoch_bound(7));
        let mut algo = OnPolicyAlgorithm::new(env, reinforce(), hooks, state);
        let curve = algo.train()?;
        assert_eq!(curve.len(), 7);
        assert!(curve.iter().all(|reward| (0. ..=10.).contains(reward)));
        assert_eq!(algo.state().map(|state| state.epoch), Some(7));
        let state = algo.into_state().expect("state after training");
        assert_eq!(state.reward_curve, curve);
        Ok(())
    }

    #[test]
    fn zero_epochs_yield_an_empty_curve() -> Result<()> {
        let env = ContextualBandit::default();
        let state = state(&env, false)?;
        let hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::epoch_bound(0));
        let mut algo = OnPolicyAlgorithm::new(env, reinforce(), hooks, state);
        assert!(algo.train()?.is_empty());
        Ok(())
    }

    #[test]
    fn early_stopping_ends_training_once_the_window_is_full() -> Result<()> {
        let env = ContextualBandit::default();
        let state = state(&env, false)?;
        let monitor = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 3,
            convergence_threshold: f32::INFINITY,
            ..Default::default()
        })?;
        let hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::epoch_bound(50))
            .with_early_stopping(monitor);
        let mut algo = OnPolicyAlgorithm::new(env, reinforce(), hooks, state);
        let curve = algo.train()?;
        assert_eq!(curve.len(), 3);
        assert!(matches!(
            algo.hooks.stop_reason(),
            Some(StopReason::Converged { .. })
        ));
        Ok(())
    }

    #[test]
    fn reachable_target_stops_training() -> Result<()> {
        let env = ContextualBandit::default();
        let state = state(&env, false)?;
        let monitor = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 2,
            convergence_threshold: 0.,
            target_return: Some(0.),
            eval_interval: 1,
            eval_episodes: 1,
            ..Default::default()
        })?;
        let hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::epoch_bound(50))
            .with_early_stopping(monitor);
        let mut algo = OnPolicyAlgorithm::new(env, reinforce(), hooks, state);
        assert_eq!(algo.train()?.len(), 2);
        assert!(matches!(
            algo.hooks.stop_reason(),
            Some(StopReason::TargetReached { .. })
        ));
        Ok(())
    }

    #[test]
    fn actor_critic_needs_a_value_module() -> Result<()> {
        let env = ContextualBandit::default();
        let state = state(&env, false)?;
        let hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::epoch_bound(3));
        let agent = AgentKind::ActorCritic(ActorCritic::default());
        let mut algo = OnPolicyAlgorithm::new(env, agent, hooks, state);
        let err = algo.train().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrainError>(),
            Some(TrainError::MissingValueModule { .. })
        ));
        // the state survives a rejected configuration
        assert!(algo.state().is_some());
        Ok(())
    }

    #[test]
    fn actor_critic_runs_with_a_value_module() -> Result<()> {
        rng::set_seed(1);
        let env = ContextualBandit::default();
        let state = state(&env, true)?;
        let hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::epoch_bound(4));
        let agent = AgentKind::ActorCritic(ActorCritic {
            traces: 2,
            trace_len: 4,
            n: 2,
            ..Default::default()
        });
        let mut algo = OnPolicyAlgorithm::new(env, agent, hooks, state);
        assert_eq!(algo.train()?.len(), 4);
        Ok(())
    }

    #[test]
    fn step_bound_schedule_counts_environment_steps() -> Result<()> {
        let env = ContextualBandit::default();
        let state = state(&env, false)?;
        // each epoch collects two full bandit episodes of 10 steps
        let hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::total_step_bound(50));
        let mut algo = OnPolicyAlgorithm::new(env, reinforce(), hooks, state);
        assert_eq!(algo.train()?.len(), 3);
        Ok(())
    }
}
