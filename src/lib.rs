//! # Ciclo: one-cycle training with gradient accumulation
//!
//! Ciclo couples a one-cycle learning-rate/momentum schedule to a gradient
//! accumulation window, with a family of loss reweighting transforms that
//! rescale the gradient signal without changing its direction.
//!
//! ## Architecture
//!
//! - **optim**: Optimizers (SGD, Adam) and the one-cycle schedule
//! - **train**: Loss transforms, accumulation window, step orchestrator, epoch runner
//! - **model**: Model and parameter seams, plus a softmax classifier
//! - **data**: Ordered micro-batch datasets and a synthetic generator
//! - **config**: Declarative YAML configuration and CLI
//! - **io**: Run record saving and loading

pub mod config;
pub mod data;
pub mod io;
pub mod model;
pub mod optim;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};
pub use optim::{OneCycleSchedule, ScheduleShape};
pub use train::{AccumulationWindow, EpochRunner, LossTransform, TrainingStepOrchestrator};
