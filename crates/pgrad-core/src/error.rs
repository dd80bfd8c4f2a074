use thiserror::Error;

/// Failures that abort a training run. Configuration errors are raised before the environment is
/// touched, numeric errors surface from the update step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainError {
    #[error("unsupported action space: {0}")]
    UnsupportedActionSpace(String),

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("unknown optimizer: {0}")]
    UnknownOptimizer(String),

    #[error("{algorithm} requires a value module")]
    MissingValueModule { algorithm: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("non-finite value in {0}")]
    NonFinite(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("step called after the episode ended without a reset")]
    StepAfterDone,
}
