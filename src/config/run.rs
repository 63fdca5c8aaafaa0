//! Immutable run configuration derived from a validated spec

use super::schema::{DataSpec, RunSpec};
use super::validate::validate_config;
use crate::error::{Error, Result};
use crate::optim::{OneCycleConfig, OneCycleSchedule, Optimizer, OptimizerKind, ScheduleShape};
use crate::train::{AccumulationWindow, LossTransform};
use std::path::PathBuf;
use tracing::warn;

/// Everything a run needs, fixed before the first micro-batch
///
/// The total step budget is always derived from the same
/// [`AccumulationWindow`] that decides when to step.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub schedule: OneCycleConfig,
    pub optimizer: OptimizerKind,
    /// Constructor learning rate
    pub base_lr: f32,
    pub weight_decay: f32,
    pub batch_size: usize,
    pub micro_batch_size: usize,
    /// `batch_size / micro_batch_size`, floored
    pub accumulation_factor: usize,
    /// `ceil(train_examples / micro_batch_size)`
    pub micro_batches_in_epoch: usize,
    pub epochs: usize,
    pub loss: LossTransform,
    pub data: DataSpec,
    pub output_dir: PathBuf,
}

impl RunConfig {
    /// Validate `spec` and derive the run configuration
    pub fn from_spec(spec: &RunSpec) -> Result<Self> {
        validate_config(spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

        let data = &spec.data;
        let accumulation_factor = data.batch_size / data.micro_batch_size;
        if data.batch_size % data.micro_batch_size != 0 {
            warn!(
                batch_size = data.batch_size,
                micro_batch_size = data.micro_batch_size,
                accumulation_factor,
                effective_batch = accumulation_factor * data.micro_batch_size,
                "batch size is not a multiple of micro-batch size; accumulation factor floored"
            );
        }

        Ok(Self {
            schedule: spec.schedule,
            optimizer: spec.optimizer.name,
            base_lr: spec.optimizer.lr,
            weight_decay: spec.optimizer.weight_decay,
            batch_size: data.batch_size,
            micro_batch_size: data.micro_batch_size,
            accumulation_factor,
            micro_batches_in_epoch: data.train_examples.div_ceil(data.micro_batch_size),
            epochs: spec.training.epochs,
            loss: spec.training.loss,
            data: data.clone(),
            output_dir: spec.training.output_dir.clone(),
        })
    }

    pub fn window(&self) -> Result<AccumulationWindow> {
        AccumulationWindow::new(self.accumulation_factor, self.micro_batches_in_epoch)
    }

    /// Effective steps over the whole run
    pub fn total_steps(&self) -> Result<usize> {
        Ok(self.window()?.steps_in_epoch() * self.epochs)
    }

    pub fn schedule_shape(&self) -> Result<ScheduleShape> {
        ScheduleShape::new(self.total_steps()?, &self.schedule)
    }

    pub fn build_schedule(&self) -> Result<OneCycleSchedule> {
        Ok(OneCycleSchedule::new(self.schedule_shape()?))
    }

    pub fn build_optimizer(&self) -> Box<dyn Optimizer> {
        self.optimizer.build(self.base_lr, self.weight_decay)
    }
}
