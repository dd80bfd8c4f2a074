use crate::env::Action;
use anyhow::Result;

/// The inference side of a policy: what the trace collector and the evaluator need.
pub trait Policy {
    /// Samples an action from the induced distribution, together with its log-probability.
    fn get_action(&self, observation: &[f32]) -> Result<(Action, f32)>;

    /// The mode of the distribution, used for deterministic evaluation.
    fn greedy_action(&self, observation: &[f32]) -> Result<Action>;
}

impl<P: Policy + ?Sized> Policy for &P {
    fn get_action(&self, observation: &[f32]) -> Result<(Action, f32)> {
        (**self).get_action(observation)
    }

    fn greedy_action(&self, observation: &[f32]) -> Result<Action> {
        (**self).greedy_action(observation)
    }
}
