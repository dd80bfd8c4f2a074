use crate::error::TrainError;
use anyhow::Result;

/// Space description as reported by an environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    Discrete(usize),
    Continous {
        min: Option<Vec<f32>>,
        max: Option<Vec<f32>>,
        size: usize,
    },
    /// Anything else an environment may expose (multi-discrete, tuple spaces, ...). The trainer
    /// refuses these at setup.
    Other(String),
}

impl Space {
    pub fn continous_from_dims(dims: Vec<usize>) -> Self {
        Self::Continous {
            min: None,
            max: None,
            size: dims.iter().product(),
        }
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continous { size, .. } => *size,
            Self::Other(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }

    /// Resolves the action space once, before any training starts.
    pub fn resolve_action_space(&self) -> Result<ActionSpace> {
        Ok(ActionSpace::try_from(&self.action_space)?)
    }
}

/// The action space the trainer works with, fixed at setup.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpace {
    Discrete(usize),
    ContinuousBox {
        dims: usize,
        low: Option<Vec<f32>>,
        high: Option<Vec<f32>>,
    },
}

impl ActionSpace {
    pub fn size(&self) -> usize {
        match self {
            Self::Discrete(n) => *n,
            Self::ContinuousBox { dims, .. } => *dims,
        }
    }
}

impl TryFrom<&Space> for ActionSpace {
    type Error = TrainError;

    fn try_from(space: &Space) -> Result<Self, Self::Error> {
        match space {
            Space::Discrete(0) => Err(TrainError::UnsupportedActionSpace(
                "empty discrete space".to_owned(),
            )),
            Space::Discrete(n) => Ok(Self::Discrete(*n)),
            Space::Continous { min, max, size } if *size > 0 => Ok(Self::ContinuousBox {
                dims: *size,
                low: min.clone(),
                high: max.clone(),
            }),
            Space::Continous { .. } => Err(TrainError::UnsupportedActionSpace(
                "zero sized box".to_owned(),
            )),
            Space::Other(kind) => Err(TrainError::UnsupportedActionSpace(kind.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Discrete(usize),
    Continuous(Vec<f32>),
}

impl Action {
    /// Clamps a continuous action into the box bounds, discrete actions pass through.
    pub fn clamp(self, space: &ActionSpace) -> Self {
        match (self, space) {
            (
                Self::Continuous(values),
                ActionSpace::ContinuousBox {
                    low: Some(low),
                    high: Some(high),
                    ..
                },
            ) => Self::Continuous(
                values
                    .iter()
                    .zip(low.iter().zip(high.iter()))
                    .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
                    .collect(),
            ),
            (action, _) => action,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapShot {
    pub state: Vec<f32>,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
}

impl SnapShot {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Env {
    fn reset(&mut self, seed: u64) -> Result<Vec<f32>>;
    fn step(&mut self, action: &Action) -> Result<SnapShot>;
    fn env_description(&self) -> EnvironmentDescription;
}

impl<E: Env + ?Sized> Env for Box<E> {
    fn reset(&mut self, seed: u64) -> Result<Vec<f32>> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: &Action) -> Result<SnapShot> {
        (**self).step(action)
    }

    fn env_description(&self) -> EnvironmentDescription {
        (**self).env_description()
    }
}

/// Builds fresh environments, one per training repetition.
pub trait EnvBuilderTrait {
    type Env: Env;

    fn build_env(&self) -> Result<Self::Env>;
}

impl<E: Env, F: Fn() -> Result<E>> EnvBuilderTrait for F {
    type Env = E;

    fn build_env(&self) -> Result<Self::Env> {
        self()
    }
}
