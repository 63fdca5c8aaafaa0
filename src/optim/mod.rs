//! Optimizers and the one-cycle schedule that drives them

mod adam;
mod optimizer;
mod scheduler;
mod sgd;

pub use adam::Adam;
pub use optimizer::{Optimizer, OptimizerKind};
pub use scheduler::{
    AnnealStrategy, OneCycleConfig, OneCycleSchedule, SchedulePoint, ScheduleShape,
};
pub use sgd::Sgd;
