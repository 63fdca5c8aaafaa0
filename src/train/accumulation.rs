//! Gradient accumulation window
//!
//! Decides which micro-batches close an effective step. A step fires every
//! `accumulation_factor` micro-batches and, unconditionally, on the last
//! micro-batch of the epoch so a trailing partial window is never dropped.

use crate::error::{Error, Result};

/// Step boundaries of one epoch's micro-batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationWindow {
    accumulation_factor: usize,
    micro_batches_in_epoch: usize,
}

impl AccumulationWindow {
    pub fn new(accumulation_factor: usize, micro_batches_in_epoch: usize) -> Result<Self> {
        if accumulation_factor == 0 {
            return Err(Error::ConfigError(
                "accumulation factor must be > 0".to_string(),
            ));
        }
        if micro_batches_in_epoch == 0 {
            return Err(Error::ConfigError(
                "an epoch must contain at least one micro-batch".to_string(),
            ));
        }
        Ok(Self {
            accumulation_factor,
            micro_batches_in_epoch,
        })
    }

    pub fn accumulation_factor(&self) -> usize {
        self.accumulation_factor
    }

    pub fn micro_batches_in_epoch(&self) -> usize {
        self.micro_batches_in_epoch
    }

    /// Whether micro-batch `index` (zero-based) triggers an optimizer update
    pub fn should_step(&self, index: usize) -> bool {
        index % self.accumulation_factor == self.accumulation_factor - 1 || self.is_last(index)
    }

    pub fn is_last(&self, index: usize) -> bool {
        index == self.micro_batches_in_epoch - 1
    }

    /// Effective steps per epoch: `ceil(micro_batches / accumulation_factor)`
    pub fn steps_in_epoch(&self) -> usize {
        self.micro_batches_in_epoch.div_ceil(self.accumulation_factor)
    }
}

/// Micro-batches and loss seen since the last optimizer update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulationState {
    micro_batches: usize,
    loss_sum: f32,
    last_micro_batch: bool,
}

impl AccumulationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one micro-batch's reduced loss
    pub fn record(&mut self, loss: f32, last_micro_batch: bool) {
        self.micro_batches += 1;
        self.loss_sum += loss;
        self.last_micro_batch = last_micro_batch;
    }

    pub fn micro_batches(&self) -> usize {
        self.micro_batches
    }

    /// Whether the most recent micro-batch was the epoch's last
    pub fn is_last_micro_batch(&self) -> bool {
        self.last_micro_batch
    }

    /// Mean reduced loss over the current window (reporting only)
    pub fn mean_loss(&self) -> f32 {
        if self.micro_batches == 0 {
            0.0
        } else {
            self.loss_sum / self.micro_batches as f32
        }
    }

    /// Start a new window after an update; the last-micro-batch flag is kept
    pub fn close_window(&mut self) {
        self.micro_batches = 0;
        self.loss_sum = 0.0;
    }

    /// Clear everything, including the last-micro-batch flag
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
