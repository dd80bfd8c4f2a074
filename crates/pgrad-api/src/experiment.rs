use crate::{
    builders::on_policy_algo::{DefaultOnPolicyAlgorithm, OnPolicyAlgorithmBuilder},
    config::TrainingConfig,
};
use anyhow::Result;
use pgrad_core::{Algorithm, env::EnvBuilderTrait, reward_curve::RewardCurve, rng};
use tracing::info;

/// Seeds the run, builds fresh modules and trains them once. The trained algorithm is handed back
/// together with its reward curve, for evaluation.
pub fn train_once<EB: EnvBuilderTrait>(
    config: &TrainingConfig,
    env_builder: &EB,
    seed: u64,
) -> Result<(RewardCurve, DefaultOnPolicyAlgorithm<EB::Env>)> {
    let builder = OnPolicyAlgorithmBuilder::from_config(config)?;
    rng::set_seed(seed);
    let mut algo = builder.build(env_builder)?;
    let reward_curve = algo.train()?;
    Ok((reward_curve, algo))
}

/// Trains `config.repetitions` independent agents, repetition `i` seeded with `seed + i`, and
/// averages their reward curves. Curves cut short by early stopping truncate the average.
pub fn run_repetitions<EB: EnvBuilderTrait>(
    config: &TrainingConfig,
    env_builder: &EB,
) -> Result<RewardCurve> {
    config.validate()?;
    let mut curves = Vec::with_capacity(config.repetitions);
    for repetition in 0..config.repetitions {
        let seed = config.seed.wrapping_add(repetition as u64);
        info!(repetition, seed, algorithm = %config.algorithm, "starting repetition");
        let (reward_curve, _) = train_once(config, env_builder, seed)?;
        info!(repetition, epochs = reward_curve.len(), "repetition finished");
        curves.push(reward_curve);
    }
    Ok(RewardCurve::mean_of(&curves))
}
