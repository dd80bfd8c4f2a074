use anyhow::Result;
use pgrad_core::{
    env::{Action, Env, EnvironmentDescription, SnapShot, Space},
    error::TrainError,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::f32::consts::PI;

const MAX_SPEED: f32 = 8.;
const MAX_TORQUE: f32 = 2.;
const DT: f32 = 0.05;
const GRAVITY: f32 = 10.;
const MASS: f32 = 1.;
const LENGTH: f32 = 1.;

fn angle_normalize(theta: f32) -> f32 {
    (theta + PI).rem_euclid(2. * PI) - PI
}

/// Swing-up of an inverted pendulum with a continuous torque in `[-2, 2]`. Never terminates, the
/// episode is truncated after `max_steps`.
#[derive(Debug, Clone)]
pub struct Pendulum {
    pub max_steps: usize,
    theta: f32,
    theta_dot: f32,
    steps: usize,
    done: bool,
}

impl Default for Pendulum {
    fn default() -> Self {
        Self {
            max_steps: 200,
            theta: 0.,
            theta_dot: 0.,
            steps: 0,
            done: false,
        }
    }
}

impl Pendulum {
    fn observation(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Env for Pendulum {
    fn reset(&mut self, seed: u64) -> Result<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.theta = rng.random_range(-PI..PI);
        self.theta_dot = rng.random_range(-1. ..1.);
        self.steps = 0;
        self.done = false;
        Ok(self.observation())
    }

    fn step(&mut self, action: &Action) -> Result<SnapShot> {
        if self.done {
            return Err(TrainError::StepAfterDone.into());
        }
        let torque = match action {
            Action::Continuous(values) if values.len() == 1 => {
                values[0].clamp(-MAX_TORQUE, MAX_TORQUE)
            }
            Action::Continuous(values) => {
                return Err(TrainError::DimensionMismatch {
                    expected: 1,
                    actual: values.len(),
                }
                .into());
            }
            Action::Discrete(_) => {
                return Err(TrainError::UnsupportedActionSpace(
                    "pendulum takes a continuous torque".to_owned(),
                )
                .into());
            }
        };
        let cost = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2);
        let theta_dot = self.theta_dot
            + (3. * GRAVITY / (2. * LENGTH) * self.theta.sin()
                + 3. / (MASS * LENGTH.powi(2)) * torque)
                * DT;
        self.theta_dot = theta_dot.clamp(-MAX_SPEED, MAX_SPEED);
        self.theta += self.theta_dot * DT;
        self.steps += 1;
        let truncated = self.steps >= self.max_steps;
        self.done = truncated;
        Ok(SnapShot {
            state: self.observation(),
            reward: -cost,
            terminated: false,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::Continous {
                min: Some(vec![-1., -1., -MAX_SPEED]),
                max: Some(vec![1., 1., MAX_SPEED]),
                size: 3,
            },
            Space::Continous {
                min: Some(vec![-MAX_TORQUE]),
                max: Some(vec![MAX_TORQUE]),
                size: 1,
            },
        )
    }
}
