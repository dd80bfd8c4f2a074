pub mod early_stopping;
pub mod env;
pub mod error;
pub mod policy;
pub mod returns;
pub mod reward_curve;
pub mod rng;
pub mod trace;

use anyhow::Result;
use reward_curve::RewardCurve;

/// A learning algorithm. The on-policy driver is the only implementor; it hands back one reward
/// per completed epoch.
pub trait Algorithm {
    fn train(&mut self) -> Result<RewardCurve>;
}
