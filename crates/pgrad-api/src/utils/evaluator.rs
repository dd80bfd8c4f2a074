use anyhow::Result;
use pgrad_core::{env::Env, policy::Policy, trace::run_greedy_episode};
use tracing::info;

/// Greedy evaluation of a trained policy on an environment of its own.
pub struct Evaluator<E: Env> {
    pub env: E,
    pub eval_episodes: usize,
    pub max_steps: Option<usize>,
}

impl<E: Env> Evaluator<E> {
    pub fn new(env: E, eval_episodes: usize, max_steps: Option<usize>) -> Self {
        Self {
            env,
            eval_episodes,
            max_steps,
        }
    }

    /// Total reward of every evaluation episode.
    pub fn evaluate<P: Policy + ?Sized>(&mut self, policy: &P) -> Result<Vec<f32>> {
        let returns = (0..self.eval_episodes)
            .map(|_| run_greedy_episode(policy, &mut self.env, self.max_steps))
            .collect::<Result<Vec<f32>>>()?;
        let mean = returns.iter().sum::<f32>() / returns.len().max(1) as f32;
        info!(episodes = returns.len(), mean_return = mean, "evaluation finished");
        Ok(returns)
    }
}

#[cfg(test)]
mod test {
    use super::Evaluator;
    use anyhow::Result;
    use pgrad_core::{env::Action, policy::Policy};
    use pgrad_envs::cartpole::CartPole;

    struct PushLeft;

    impl Policy for PushLeft {
        fn get_action(&self, _observation: &[f32]) -> Result<(Action, f32)> {
            Ok((Action::Discrete(0), 0.))
        }

        fn greedy_action(&self, _observation: &[f32]) -> Result<Action> {
            Ok(Action::Discrete(0))
        }
    }

    #[test]
    fn one_return_per_episode() -> Result<()> {
        let mut evaluator = Evaluator::new(CartPole::default(), 3, Some(500));
        let returns = evaluator.evaluate(&PushLeft)?;
        assert_eq!(returns.len(), 3);
        // pushing one way drops the pole long before the step limit
        assert!(returns.iter().all(|ret| *ret > 0. && *ret < 100.));
        Ok(())
    }
}
