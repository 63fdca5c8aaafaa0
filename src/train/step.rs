//! Per-micro-batch training step with gradient accumulation

use super::accumulation::{AccumulationState, AccumulationWindow};
use super::loss::{CrossEntropy, LossTransform};
use super::metrics::count_correct;
use crate::error::Result;
use crate::model::{Batch, Model};
use crate::optim::{OneCycleSchedule, Optimizer};

/// Where the orchestrator sits in the accumulate/step cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// Gradients are being summed; no update pending
    Accumulating,
    /// The latest micro-batch closed a window and the update was applied
    Stepping,
    /// The epoch's last micro-batch has been processed
    EpochDone,
}

/// Record of one optimizer update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Effective-step index the update was scheduled for
    pub step: usize,
    pub lr: f32,
    pub momentum: f32,
    /// Mean reduced loss over the window's micro-batches
    pub window_loss: f32,
    /// Micro-batches folded into this update
    pub micro_batches: usize,
}

/// Outcome of processing one micro-batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MicroBatchOutcome {
    /// Reduced (transformed) training loss
    pub loss: f32,
    pub correct: usize,
    pub total: usize,
    /// Present when this micro-batch closed an accumulation window
    pub step: Option<StepReport>,
}

/// Couples the loss transform, accumulation window and one-cycle schedule
///
/// Owns the effective-step counter: it advances by exactly one per
/// optimizer update and is never reset between epochs.
pub struct TrainingStepOrchestrator {
    schedule: OneCycleSchedule,
    loss: LossTransform,
    optimizer: Box<dyn Optimizer>,
    effective_step: usize,
    state: AccumulationState,
    phase: StepPhase,
}

impl TrainingStepOrchestrator {
    pub fn new(
        schedule: OneCycleSchedule,
        loss: LossTransform,
        optimizer: Box<dyn Optimizer>,
    ) -> Self {
        Self {
            schedule,
            loss,
            optimizer,
            effective_step: 0,
            state: AccumulationState::new(),
            phase: StepPhase::Accumulating,
        }
    }

    pub fn schedule(&self) -> &OneCycleSchedule {
        &self.schedule
    }

    pub fn loss_transform(&self) -> LossTransform {
        self.loss
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    /// Optimizer updates performed so far across the whole run
    pub fn effective_step(&self) -> usize {
        self.effective_step
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn accumulation_state(&self) -> &AccumulationState {
        &self.state
    }

    /// Reset per-epoch accumulation state
    pub fn begin_epoch<M: Model + ?Sized>(&mut self, model: &mut M) {
        self.state.reset();
        self.optimizer.zero_grad(model.params_mut());
        self.phase = StepPhase::Accumulating;
    }

    /// Forward, reduce, backward-accumulate, and step when `window` says so
    ///
    /// Any numeric failure is returned immediately; nothing is retried.
    pub fn process_micro_batch<M: Model + ?Sized>(
        &mut self,
        model: &mut M,
        batch: &Batch,
        index: usize,
        window: &AccumulationWindow,
    ) -> Result<MicroBatchOutcome> {
        let logits = model.forward(&batch.inputs)?;
        let ce = CrossEntropy::compute(&logits, &batch.labels)?;
        let loss = self.loss.reduce(&ce.losses)?;
        let weights = self.loss.gradient_weights(&ce.losses)?;
        model.backward(&ce.weighted_grad(&weights)?)?;

        let correct = count_correct(&logits, &batch.labels)?;
        let is_last = window.is_last(index);
        self.state.record(loss, is_last);

        let step = if window.should_step(index) {
            Some(self.apply_update(model)?)
        } else {
            None
        };

        self.phase = match (is_last, step.is_some()) {
            (true, _) => StepPhase::EpochDone,
            (false, true) => StepPhase::Stepping,
            (false, false) => StepPhase::Accumulating,
        };

        Ok(MicroBatchOutcome {
            loss,
            correct,
            total: batch.len(),
            step,
        })
    }

    fn apply_update<M: Model + ?Sized>(&mut self, model: &mut M) -> Result<StepReport> {
        let step = self.effective_step;
        let (lr, momentum) = self.schedule.rate_and_momentum(step)?;

        self.optimizer.set_lr(lr);
        self.optimizer.set_momentum(momentum);
        self.optimizer.step(model.params_mut());
        self.optimizer.zero_grad(model.params_mut());
        self.effective_step += 1;

        let report = StepReport {
            step,
            lr,
            momentum,
            window_loss: self.state.mean_loss(),
            micro_batches: self.state.micro_batches(),
        };
        self.state.close_window();
        Ok(report)
    }
}
