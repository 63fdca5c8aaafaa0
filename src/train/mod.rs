//! Training-step orchestration
//!
//! This module provides:
//! - Loss reweighting transforms over per-example cross-entropy
//! - The gradient accumulation window
//! - The per-micro-batch orchestrator that couples both to the one-cycle schedule
//! - The epoch runner and per-epoch accuracy log
//!
//! # Example
//!
//! ```no_run
//! use ciclo::data::SyntheticBlobs;
//! use ciclo::model::SoftmaxClassifier;
//! use ciclo::optim::{OneCycleConfig, OneCycleSchedule, ScheduleShape, Sgd};
//! use ciclo::train::{AccumulationWindow, EpochRunner, LossTransform};
//! use ciclo::data::Dataset;
//!
//! let blobs = SyntheticBlobs::new(8, 4, 0)?;
//! let train = blobs.dataset(1024, 32, 1)?;
//! let eval = blobs.dataset(256, 64, 2)?;
//!
//! let window = AccumulationWindow::new(4, train.len())?;
//! let shape = ScheduleShape::new(window.steps_in_epoch() * 10, &OneCycleConfig::default())?;
//! let mut runner = EpochRunner::from_parts(
//!     window,
//!     OneCycleSchedule::new(shape),
//!     LossTransform::MeanSquare,
//!     Box::new(Sgd::new(0.1, 0.9).with_weight_decay(5e-4)),
//!     10,
//! )?;
//!
//! let mut model = SoftmaxClassifier::new(8, 4, 0);
//! runner.run(&mut model, &train, &eval)?;
//! # Ok::<(), ciclo::Error>(())
//! ```

mod accumulation;
mod epoch;
mod loss;
mod metrics;
mod step;

pub use accumulation::{AccumulationState, AccumulationWindow};
pub use epoch::{EpochRunner, RunResult};
pub use loss::{CrossEntropy, LossTransform};
pub use metrics::{count_correct, BatchStats, EpochMetrics, RunMetricsLog};
pub use step::{MicroBatchOutcome, StepPhase, StepReport, TrainingStepOrchestrator};
