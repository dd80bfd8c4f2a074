//! Environments implemented directly in Rust, no simulator process needed.

pub mod cartpole;
pub mod pendulum;
pub mod toy;

use anyhow::Result;
use pgrad_core::{
    env::{Action, Env, EnvironmentDescription, SnapShot},
    error::TrainError,
};

/// The environments of this crate behind one type, chosen by name.
#[derive(Debug, Clone)]
pub enum EnvKind {
    CartPole(cartpole::CartPole),
    Pendulum(pendulum::Pendulum),
    Bandit(toy::ContextualBandit),
    Reach(toy::Reach),
}

impl EnvKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "CartPole-v1" | "cartpole" => Ok(Self::CartPole(cartpole::CartPole::default())),
            "Pendulum-v1" | "pendulum" => Ok(Self::Pendulum(pendulum::Pendulum::default())),
            "bandit" => Ok(Self::Bandit(toy::ContextualBandit::default())),
            "reach" => Ok(Self::Reach(toy::Reach::default())),
            _ => Err(TrainError::InvalidConfig(format!("unknown environment {name}")).into()),
        }
    }
}

impl Env for EnvKind {
    fn reset(&mut self, seed: u64) -> Result<Vec<f32>> {
        match self {
            Self::CartPole(env) => env.reset(seed),
            Self::Pendulum(env) => env.reset(seed),
            Self::Bandit(env) => env.reset(seed),
            Self::Reach(env) => env.reset(seed),
        }
    }

    fn step(&mut self, action: &Action) -> Result<SnapShot> {
        match self {
            Self::CartPole(env) => env.step(action),
            Self::Pendulum(env) => env.step(action),
            Self::Bandit(env) => env.step(action),
            Self::Reach(env) => env.step(action),
        }
    }

    fn env_description(&self) -> EnvironmentDescription {
        match self {
            Self::CartPole(env) => env.env_description(),
            Self::Pendulum(env) => env.env_description(),
            Self::Bandit(env) => env.env_description(),
            Self::Reach(env) => env.env_description(),
        }
    }
}
