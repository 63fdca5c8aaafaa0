//! Epoch-level driver: one training pass, one evaluation pass, per epoch

use super::accumulation::AccumulationWindow;
use super::loss::{CrossEntropy, LossTransform};
use super::metrics::{count_correct, BatchStats, EpochMetrics, RunMetricsLog};
use super::step::TrainingStepOrchestrator;
use crate::config::RunConfig;
use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::optim::{OneCycleSchedule, Optimizer};
use std::time::Instant;
use tracing::{debug, info};

/// Summary of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    /// Epochs completed
    pub epochs: usize,
    /// Optimizer updates performed over the whole run
    pub effective_steps: usize,
    pub final_train_accuracy: f64,
    pub final_validation_accuracy: f64,
    pub best_validation_accuracy: f64,
    /// Wall time in seconds
    pub elapsed_secs: f64,
}

/// Drives epochs `0..epochs` strictly in order
///
/// The schedule's step budget must equal `window.steps_in_epoch() * epochs`;
/// construction rejects any other pairing.
pub struct EpochRunner {
    window: AccumulationWindow,
    epochs: usize,
    orchestrator: TrainingStepOrchestrator,
    metrics: RunMetricsLog,
}

impl EpochRunner {
    /// Build the window, schedule and optimizer described by `config`
    pub fn new(config: &RunConfig) -> Result<Self> {
        let window = config.window()?;
        let schedule = OneCycleSchedule::new(config.schedule_shape()?);
        Self::from_parts(
            window,
            schedule,
            config.loss,
            config.build_optimizer(),
            config.epochs,
        )
    }

    pub fn from_parts(
        window: AccumulationWindow,
        schedule: OneCycleSchedule,
        loss: LossTransform,
        optimizer: Box<dyn Optimizer>,
        epochs: usize,
    ) -> Result<Self> {
        if epochs == 0 {
            return Err(Error::ConfigError("epochs must be > 0".to_string()));
        }
        let expected = window.steps_in_epoch() * epochs;
        if schedule.total_steps() != expected {
            return Err(Error::ConfigError(format!(
                "schedule has {} steps but {} epochs of {} steps need {}",
                schedule.total_steps(),
                epochs,
                window.steps_in_epoch(),
                expected
            )));
        }
        Ok(Self {
            window,
            epochs,
            orchestrator: TrainingStepOrchestrator::new(schedule, loss, optimizer),
            metrics: RunMetricsLog::new(),
        })
    }

    pub fn window(&self) -> &AccumulationWindow {
        &self.window
    }

    pub fn schedule(&self) -> &OneCycleSchedule {
        self.orchestrator.schedule()
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn effective_step(&self) -> usize {
        self.orchestrator.effective_step()
    }

    pub fn orchestrator(&self) -> &TrainingStepOrchestrator {
        &self.orchestrator
    }

    pub fn metrics(&self) -> &RunMetricsLog {
        &self.metrics
    }

    pub fn into_metrics(self) -> RunMetricsLog {
        self.metrics
    }

    /// One training pass in delivery order; returns the pass statistics
    pub fn train_epoch<M, D>(&mut self, model: &mut M, data: &D) -> Result<BatchStats>
    where
        M: Model + ?Sized,
        D: Dataset + ?Sized,
    {
        let expected = self.window.micro_batches_in_epoch();
        if data.len() != expected {
            return Err(Error::DatasetLengthMismatch {
                expected,
                got: data.len(),
            });
        }

        self.orchestrator.begin_epoch(model);
        let mut stats = BatchStats::new();
        let mut seen = 0;
        for (index, batch) in data.micro_batches().enumerate() {
            if index >= expected {
                return Err(Error::DatasetLengthMismatch {
                    expected,
                    got: index + 1,
                });
            }
            let outcome =
                self.orchestrator
                    .process_micro_batch(model, &batch, index, &self.window)?;
            stats.record(outcome.correct, outcome.total, outcome.loss);
            if let Some(report) = outcome.step {
                debug!(
                    step = report.step,
                    lr = report.lr,
                    momentum = report.momentum,
                    window_loss = report.window_loss,
                    micro_batches = report.micro_batches,
                    running_accuracy = stats.accuracy(),
                    "optimizer step"
                );
            }
            seen += 1;
        }
        if seen != expected {
            return Err(Error::DatasetLengthMismatch {
                expected,
                got: seen,
            });
        }
        Ok(stats)
    }

    /// Evaluation pass: identity loss, no gradients, no schedule queries
    pub fn evaluate<M, D>(&self, model: &M, data: &D) -> Result<BatchStats>
    where
        M: Model + ?Sized,
        D: Dataset + ?Sized,
    {
        let mut stats = BatchStats::new();
        for batch in data.micro_batches() {
            let logits = model.infer(&batch.inputs)?;
            let ce = CrossEntropy::compute(&logits, &batch.labels)?;
            let loss = LossTransform::Identity.reduce(&ce.losses)?;
            stats.record(count_correct(&logits, &batch.labels)?, batch.len(), loss);
        }
        Ok(stats)
    }

    /// Train then evaluate once and append the accuracy pair
    pub fn run_epoch<M, D, E>(&mut self, model: &mut M, train: &D, eval: &E) -> Result<EpochMetrics>
    where
        M: Model + ?Sized,
        D: Dataset + ?Sized,
        E: Dataset + ?Sized,
    {
        let train_stats = self.train_epoch(model, train)?;
        let eval_stats = self.evaluate(model, eval)?;
        let recorded = self
            .metrics
            .push(train_stats.accuracy(), eval_stats.accuracy());
        info!(
            epoch = recorded.epoch,
            train_acc = recorded.train_accuracy,
            train_loss = train_stats.mean_loss(),
            valid_acc = recorded.validation_accuracy,
            valid_loss = eval_stats.mean_loss(),
            step = self.orchestrator.effective_step(),
            "epoch complete"
        );
        Ok(recorded)
    }

    /// Run every remaining epoch; all-epochs-or-abort
    pub fn run<M, D, E>(&mut self, model: &mut M, train: &D, eval: &E) -> Result<RunResult>
    where
        M: Model + ?Sized,
        D: Dataset + ?Sized,
        E: Dataset + ?Sized,
    {
        let start = Instant::now();
        while self.metrics.epochs() < self.epochs {
            self.run_epoch(model, train, eval)?;
        }

        let step = self.orchestrator.effective_step();
        ensure_budget_spent(step, self.schedule().total_steps())?;

        let last = self.metrics.last();
        Ok(RunResult {
            epochs: self.metrics.epochs(),
            effective_steps: step,
            final_train_accuracy: last.map_or(0.0, |m| m.train_accuracy),
            final_validation_accuracy: last.map_or(0.0, |m| m.validation_accuracy),
            best_validation_accuracy: self
                .metrics
                .best_validation()
                .map_or(0.0, |m| m.validation_accuracy),
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// A finished run must have taken exactly the planned number of updates
fn ensure_budget_spent(completed: usize, total_steps: usize) -> Result<()> {
    if completed == total_steps {
        Ok(())
    } else {
        Err(Error::StepBudgetMismatch {
            completed,
            total_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InMemoryDataset, SyntheticBlobs};
    use crate::model::SoftmaxClassifier;
    use crate::optim::{OneCycleConfig, ScheduleShape, Sgd};

    fn runner(factor: usize, micro_batches: usize, epochs: usize) -> EpochRunner {
        let window = AccumulationWindow::new(factor, micro_batches).unwrap();
        let shape =
            ScheduleShape::new(window.steps_in_epoch() * epochs, &OneCycleConfig::default())
                .unwrap();
        EpochRunner::from_parts(
            window,
            OneCycleSchedule::new(shape),
            LossTransform::MeanSquare,
            Box::new(Sgd::new(0.1, 0.9)),
            epochs,
        )
        .unwrap()
    }

    fn blobs() -> SyntheticBlobs {
        SyntheticBlobs::new(4, 3, 11).unwrap()
    }

    #[test]
    fn test_rejects_mismatched_schedule_budget() {
        let window = AccumulationWindow::new(4, 10).unwrap();
        let shape = ScheduleShape::new(5, &OneCycleConfig::default()).unwrap();
        let result = EpochRunner::from_parts(
            window,
            OneCycleSchedule::new(shape),
            LossTransform::Identity,
            Box::new(Sgd::new(0.1, 0.9)),
            2,
        );
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_rejects_zero_epochs() {
        let window = AccumulationWindow::new(4, 10).unwrap();
        let shape = ScheduleShape::new(3, &OneCycleConfig::default()).unwrap();
        let result = EpochRunner::from_parts(
            window,
            OneCycleSchedule::new(shape),
            LossTransform::Identity,
            Box::new(Sgd::new(0.1, 0.9)),
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_effective_steps_match_budget_with_partial_windows() {
        // 10 micro-batches of 4 examples, window of 4: 3 steps per epoch
        let train = blobs().dataset(40, 4, 1).unwrap();
        let eval = blobs().dataset(12, 6, 2).unwrap();
        let mut model = SoftmaxClassifier::new(4, 3, 0);
        let mut runner = runner(4, train.len(), 5);

        let result = runner.run(&mut model, &train, &eval).unwrap();
        assert_eq!(result.effective_steps, 15);
        assert_eq!(result.epochs, 5);
        assert_eq!(runner.effective_step(), 15);
        assert_eq!(runner.metrics().epochs(), 5);
    }

    #[test]
    fn test_dataset_length_is_checked() {
        let train = blobs().dataset(40, 8, 1).unwrap();
        let mut model = SoftmaxClassifier::new(4, 3, 0);
        let mut runner = runner(2, 10, 1);

        let err = runner.train_epoch(&mut model, &train).unwrap_err();
        assert!(matches!(
            err,
            Error::DatasetLengthMismatch {
                expected: 10,
                got: 5
            }
        ));
        assert_eq!(runner.effective_step(), 0);
    }

    #[test]
    fn test_evaluation_never_steps() {
        let eval = blobs().dataset(30, 10, 3).unwrap();
        let model = SoftmaxClassifier::new(4, 3, 0);
        let runner = runner(1, 3, 1);

        let stats = runner.evaluate(&model, &eval).unwrap();
        assert_eq!(stats.total, 30);
        assert_eq!(stats.batches, 3);
        assert!(stats.mean_loss() > 0.0);
        assert_eq!(runner.effective_step(), 0);
    }

    #[test]
    fn test_training_improves_separable_data() {
        let generator = blobs().with_spread(0.3);
        let train = generator.dataset(300, 10, 1).unwrap();
        let eval = generator.dataset(90, 30, 2).unwrap();
        let mut model = SoftmaxClassifier::new(4, 3, 5);
        let mut runner = runner(3, train.len(), 8);

        runner.run(&mut model, &train, &eval).unwrap();
        let after = runner.metrics().last().unwrap().validation_accuracy;
        assert!(after > 0.5, "validation accuracy {after}");
    }

    #[test]
    fn test_run_resumes_remaining_epochs_only() {
        let train = blobs().dataset(20, 5, 1).unwrap();
        let eval = InMemoryDataset::new(
            ndarray::Array2::zeros((2, 4)),
            vec![0, 1],
            2,
        )
        .unwrap();
        let mut model = SoftmaxClassifier::new(4, 3, 0);
        let mut runner = runner(2, train.len(), 3);

        runner.run_epoch(&mut model, &train, &eval).unwrap();
        assert_eq!(runner.effective_step(), 2);
        let result = runner.run(&mut model, &train, &eval).unwrap();
        assert_eq!(result.epochs, 3);
        assert_eq!(result.effective_steps, 6);
        assert_eq!(runner.into_metrics().epochs(), 3);
    }

    #[test]
    fn test_unspent_budget_is_reported_as_mismatch() {
        assert!(ensure_budget_spent(6, 6).is_ok());
        let err = ensure_budget_spent(4, 6).unwrap_err();
        assert!(matches!(
            err,
            Error::StepBudgetMismatch {
                completed: 4,
                total_steps: 6
            }
        ));
        assert!(err.to_string().contains("4 optimizer steps but 6 were planned"));
    }
}
