use anyhow::Result;
use clap::Parser;
use pgrad_api::{config::TrainingConfig, experiment::run_repetitions, logging::init_tracing};
use pgrad_envs::EnvKind;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// JSON training config, defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// `CartPole-v1`, `Pendulum-v1`, `bandit` or `reach`.
    #[arg(long, default_value = "CartPole-v1")]
    env_name: String,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log);
    let config = match &args.config {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };
    // unknown names fail here, before any training
    EnvKind::from_name(&args.env_name)?;
    let env_builder = || EnvKind::from_name(&args.env_name);
    let curve = run_repetitions(&config, &env_builder)?;
    info!(
        env = %args.env_name,
        algorithm = %config.algorithm,
        repetitions = config.repetitions,
        epochs = curve.len(),
        final_reward = ?curve.last(),
        "mean reward curve"
    );
    println!("{}", serde_json::to_string(&curve.0)?);
    Ok(())
}
