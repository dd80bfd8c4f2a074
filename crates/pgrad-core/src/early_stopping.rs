use crate::error::TrainError;
use anyhow::Result;
use std::collections::VecDeque;

/// Parameters of the early-stopping monitor. The monitor only exists when a window size is
/// configured.
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStoppingConfig {
    /// Number of most recent epoch rewards the statistics are computed over.
    pub window: usize,
    /// Stop once the standard deviation of the window drops below this.
    pub convergence_threshold: f32,
    /// Stop once the mean of the newer half of the window exceeds the older half by less than this.
    pub min_improvement: Option<f32>,
    /// Stop once a deterministic evaluation reaches this mean return.
    pub target_return: Option<f32>,
    pub eval_episodes: usize,
    /// Epochs between two deterministic evaluations.
    pub eval_interval: usize,
}

impl EarlyStoppingConfig {
    pub fn with_window(window: usize) -> Self {
        Self {
            window,
            ..Default::default()
        }
    }
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self {
            window: 50,
            convergence_threshold: 1e-2,
            min_improvement: None,
            target_return: None,
            eval_episodes: 5,
            eval_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopReason {
    Converged { std: f32 },
    Plateau { improvement: f32 },
    TargetReached { eval_return: f32 },
}

#[derive(Debug, Clone)]
pub struct EarlyStoppingMonitor {
    config: EarlyStoppingConfig,
    window: VecDeque<f32>,
    epochs_seen: usize,
}

fn mean(values: impl ExactSizeIterator<Item = f32>) -> f32 {
    let len = values.len() as f32;
    values.sum::<f32>() / len
}

impl EarlyStoppingMonitor {
    /// Fails on an empty window, and on a target return without evaluation episodes or interval.
    pub fn new(config: EarlyStoppingConfig) -> Result<Self> {
        if config.window == 0 {
            return Err(TrainError::InvalidConfig(
                "early stopping window must be at least 1".to_owned(),
            )
            .into());
        }
        if config.target_return.is_some() && (config.eval_episodes == 0 || config.eval_interval == 0)
        {
            return Err(TrainError::InvalidConfig(
                "target return needs eval_episodes and eval_interval of at least 1".to_owned(),
            )
            .into());
        }
        let window = VecDeque::with_capacity(config.window);
        Ok(Self {
            config,
            window,
            epochs_seen: 0,
        })
    }

    pub fn config(&self) -> &EarlyStoppingConfig {
        &self.config
    }

    pub fn window(&self) -> &VecDeque<f32> {
        &self.window
    }

    pub fn is_full(&self) -> bool {
        self.window.len() >= self.config.window
    }

    /// Pushes the newest epoch reward, evicting the oldest once the window is full.
    pub fn record(&mut self, epoch_reward: f32) {
        if self.is_full() {
            self.window.pop_front();
        }
        self.window.push_back(epoch_reward);
        self.epochs_seen += 1;
    }

    /// Checks the window statistics. Never fires before the window is full.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if !self.is_full() {
            return None;
        }
        let window_mean = mean(self.window.iter().copied());
        let variance = mean(self.window.iter().map(|r| (r - window_mean).powi(2)));
        let std = variance.sqrt();
        if std < self.config.convergence_threshold {
            return Some(StopReason::Converged { std });
        }
        let min_improvement = self.config.min_improvement?;
        let half = self.window.len() / 2;
        if half == 0 {
            return None;
        }
        let older = mean(self.window.iter().take(half).copied());
        let newer = mean(self.window.iter().skip(half).copied());
        let improvement = newer - older;
        (improvement < min_improvement).then_some(StopReason::Plateau { improvement })
    }

    pub fn should_stop(&self) -> bool {
        self.stop_reason().is_some()
    }

    /// Whether a deterministic evaluation is due after the latest recorded epoch.
    pub fn evaluation_due(&self) -> bool {
        self.config.target_return.is_some()
            && self.is_full()
            && self.epochs_seen % self.config.eval_interval == 0
    }

    pub fn target_reached(&self, eval_return: f32) -> Option<StopReason> {
        let target = self.config.target_return?;
        (self.is_full() && eval_return >= target)
            .then_some(StopReason::TargetReached { eval_return })
    }
}

#[cfg(test)]
mod test {
    use super::{EarlyStoppingConfig, EarlyStoppingMonitor, StopReason};
    use crate::error::TrainError;
    use anyhow::Result;

    #[test]
    fn never_stops_before_window_is_full() -> Result<()> {
        let mut monitor = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 5,
            convergence_threshold: f32::INFINITY,
            min_improvement: Some(f32::INFINITY),
            target_return: Some(f32::NEG_INFINITY),
            ..Default::default()
        })?;
        for reward in [1., 1., 1., 1.] {
            monitor.record(reward);
            assert!(!monitor.should_stop());
            assert!(!monitor.evaluation_due());
            assert_eq!(monitor.target_reached(f32::INFINITY), None);
        }
        monitor.record(1.);
        assert!(monitor.should_stop());
        Ok(())
    }

    #[test]
    fn constant_rewards_converge() -> Result<()> {
        let mut monitor = EarlyStoppingMonitor::new(EarlyStoppingConfig::with_window(3))?;
        for _ in 0..3 {
            monitor.record(500.);
        }
        assert_eq!(monitor.stop_reason(), Some(StopReason::Converged { std: 0. }));
        Ok(())
    }

    #[test]
    fn improving_rewards_keep_training() -> Result<()> {
        let mut monitor = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 4,
            min_improvement: Some(1.),
            ..Default::default()
        })?;
        for reward in [10., 20., 30., 40.] {
            monitor.record(reward);
        }
        assert_eq!(monitor.stop_reason(), None);
        Ok(())
    }

    #[test]
    fn plateau_stops() -> Result<()> {
        let mut monitor = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 4,
            min_improvement: Some(1.),
            ..Default::default()
        })?;
        for reward in [10., 20., 12., 18.] {
            monitor.record(reward);
        }
        assert_eq!(
            monitor.stop_reason(),
            Some(StopReason::Plateau { improvement: 0. })
        );
        Ok(())
    }

    #[test]
    fn window_slides() -> Result<()> {
        let mut monitor = EarlyStoppingMonitor::new(EarlyStoppingConfig::with_window(2))?;
        for reward in [1., 2., 3.] {
            monitor.record(reward);
        }
        assert_eq!(monitor.window().iter().copied().collect::<Vec<_>>(), vec![2., 3.]);
        Ok(())
    }

    #[test]
    fn evaluation_runs_on_interval_once_full() -> Result<()> {
        let mut monitor = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 2,
            convergence_threshold: 0.,
            target_return: Some(100.),
            eval_interval: 2,
            ..Default::default()
        })?;
        monitor.record(1.);
        assert!(!monitor.evaluation_due());
        monitor.record(2.);
        assert!(monitor.evaluation_due());
        monitor.record(3.);
        assert!(!monitor.evaluation_due());
        assert_eq!(monitor.target_reached(99.), None);
        assert_eq!(
            monitor.target_reached(100.),
            Some(StopReason::TargetReached { eval_return: 100. })
        );
        Ok(())
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 0,
            target_return: Some(0.),
            ..Default::default()
        })
        .err()
        .expect("zero window");
        assert!(matches!(
            err.downcast_ref::<TrainError>(),
            Some(TrainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn target_without_evaluation_interval_is_rejected() {
        let result = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 3,
            target_return: Some(10.),
            eval_interval: 0,
            ..Default::default()
        });
        assert!(result.is_err());
        let without_target = EarlyStoppingMonitor::new(EarlyStoppingConfig {
            window: 3,
            eval_interval: 0,
            ..Default::default()
        });
        assert!(without_target.is_ok());
    }
}
