//! Error types for Ciclo

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Empty loss batch: cannot reduce zero per-example losses")]
    EmptyBatch,

    #[error("Non-finite loss: {value}")]
    NonFiniteLoss { value: f32 },

    #[error("Invalid gradient: {0}")]
    InvalidGradient(String),

    #[error("Schedule exhausted: step {step} requested but only {total_steps} steps were planned")]
    ScheduleExhausted { step: usize, total_steps: usize },

    #[error("Run finished after {completed} optimizer steps but {total_steps} were planned")]
    StepBudgetMismatch { completed: usize, total_steps: usize },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Dataset yielded {got} micro-batches, expected {expected}")]
    DatasetLengthMismatch { expected: usize, got: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
