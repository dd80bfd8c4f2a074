use anyhow::Result;
use pgrad_api::{config::TrainingConfig, experiment::train_once};
use pgrad_envs::{cartpole::CartPole, pendulum::Pendulum, toy::ContextualBandit};

fn ac_config(epochs: usize) -> TrainingConfig {
    TrainingConfig {
        algorithm: "ac_bootstrap".to_owned(),
        epochs,
        traces: 2,
        trace_len: 50,
        n: 5,
        baseline: true,
        hidden_layers: vec![32],
        ..Default::default()
    }
}

#[test]
fn actor_critic_cartpole_short_run() -> Result<()> {
    let env_builder = || -> Result<CartPole> { Ok(CartPole::default()) };
    let (curve, algo) = train_once(&ac_config(4), &env_builder, 0)?;
    assert_eq!(curve.len(), 4);
    // segments are capped at trace_len steps, one reward per step
    assert!(curve.iter().all(|reward| *reward >= 1. && *reward <= 50.));
    let state = algo.state().expect("state after training");
    assert!(state.learning_module.has_value_module());
    Ok(())
}

#[test]
fn actor_critic_without_baseline_subtraction() -> Result<()> {
    let config = TrainingConfig {
        baseline: false,
        ..ac_config(3)
    };
    let env_builder = || -> Result<ContextualBandit> { Ok(ContextualBandit::default()) };
    let (curve, _) = train_once(&config, &env_builder, 1)?;
    assert_eq!(curve.len(), 3);
    Ok(())
}

#[test]
fn actor_critic_pendulum_with_entropy_and_rmsprop() -> Result<()> {
    let config = TrainingConfig {
        trace_len: 20,
        entropy: true,
        entropy_factor: 0.05,
        optimizer: "rms".to_owned(),
        optimizer_v: "sgd".to_owned(),
        ..ac_config(3)
    };
    let env_builder = || -> Result<Pendulum> { Ok(Pendulum::default()) };
    let (curve, _) = train_once(&config, &env_builder, 2)?;
    assert_eq!(curve.len(), 3);
    assert!(curve.iter().all(|reward| reward.is_finite() && *reward <= 0.));
    Ok(())
}
