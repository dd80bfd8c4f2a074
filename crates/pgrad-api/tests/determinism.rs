use anyhow::Result;
use pgrad_api::{config::TrainingConfig, experiment::run_repetitions};
use pgrad_envs::{cartpole::CartPole, pendulum::Pendulum};

fn cartpole() -> Result<CartPole> {
    Ok(CartPole::default())
}

#[test]
fn same_seed_same_curve() -> Result<()> {
    let config = TrainingConfig {
        epochs: 4,
        traces: 3,
        hidden_layers: vec![16],
        seed: 17,
        ..Default::default()
    };
    let first = run_repetitions(&config, &cartpole)?;
    let second = run_repetitions(&config, &cartpole)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn continuous_runs_are_reproducible() -> Result<()> {
    let config = TrainingConfig {
        algorithm: "ac_bootstrap".to_owned(),
        epochs: 3,
        traces: 2,
        trace_len: 30,
        n: 3,
        hidden_layers: vec![8],
        seed: 4,
        ..Default::default()
    };
    let pendulum = || -> Result<Pendulum> { Ok(Pendulum::default()) };
    let first = run_repetitions(&config, &pendulum)?;
    let second = run_repetitions(&config, &pendulum)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn different_seeds_diverge() -> Result<()> {
    let config = TrainingConfig {
        epochs: 3,
        traces: 3,
        hidden_layers: vec![16],
        ..Default::default()
    };
    let first = run_repetitions(&TrainingConfig { seed: 1, ..config.clone() }, &cartpole)?;
    let second = run_repetitions(&TrainingConfig { seed: 2, ..config }, &cartpole)?;
    assert_ne!(first, second);
    Ok(())
}

#[test]
fn repetitions_average_per_epoch() -> Result<()> {
    let config = TrainingConfig {
        epochs: 3,
        traces: 2,
        hidden_layers: vec![16],
        seed: 10,
        ..Default::default()
    };
    let averaged = run_repetitions(&TrainingConfig { repetitions: 2, ..config.clone() }, &cartpole)?;
    let first = run_repetitions(&config, &cartpole)?;
    let second = run_repetitions(&TrainingConfig { seed: 11, ..config }, &cartpole)?;
    for epoch in 0..3 {
        let expected = (first[epoch] + second[epoch]) / 2.;
        assert!((averaged[epoch] - expected).abs() < 1e-4);
    }
    Ok(())
}
