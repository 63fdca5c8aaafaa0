//! Accuracy bookkeeping for a run
//!
//! - [`BatchStats`]: running correct/total and loss over one pass
//! - [`EpochMetrics`]: the train/validation accuracy pair of one epoch
//! - [`RunMetricsLog`]: append-only per-epoch history, persisted at run end

use crate::error::{Error, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Number of rows whose arg-max logit matches the label
///
/// Ties resolve to the lowest class index.
pub fn count_correct(logits: &Array2<f32>, labels: &[usize]) -> Result<usize> {
    if logits.nrows() != labels.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![logits.nrows()],
            got: vec![labels.len()],
        });
    }
    let correct = logits
        .axis_iter(Axis(0))
        .zip(labels)
        .filter(|(row, label)| {
            let predicted = row
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 {
                        (i, v)
                    } else {
                        best
                    }
                })
                .0;
            predicted == **label
        })
        .count();
    Ok(correct)
}

/// Running statistics over the micro-batches of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchStats {
    pub correct: usize,
    pub total: usize,
    pub loss_sum: f64,
    pub batches: usize,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, correct: usize, total: usize, loss: f32) {
        self.correct += correct;
        self.total += total;
        self.loss_sum += loss as f64;
        self.batches += 1;
    }

    /// `correct / total`, zero before any example is seen
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// Mean of the recorded per-batch losses
    pub fn mean_loss(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.loss_sum / self.batches as f64
        }
    }
}

/// Accuracy pair recorded after each epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_accuracy: f64,
    pub validation_accuracy: f64,
}

/// Per-epoch accuracy history of a run
///
/// Serializes as `[train_accuracy_by_epoch, validation_accuracy_by_epoch]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Vec<f64>, Vec<f64>)", into = "(Vec<f64>, Vec<f64>)")]
pub struct RunMetricsLog {
    train_accuracy: Vec<f64>,
    validation_accuracy: Vec<f64>,
}

impl RunMetricsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one epoch; returns the metrics as recorded
    pub fn push(&mut self, train_accuracy: f64, validation_accuracy: f64) -> EpochMetrics {
        let epoch = self.epochs();
        self.train_accuracy.push(train_accuracy);
        self.validation_accuracy.push(validation_accuracy);
        EpochMetrics {
            epoch,
            train_accuracy,
            validation_accuracy,
        }
    }

    pub fn epochs(&self) -> usize {
        self.train_accuracy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_accuracy.is_empty()
    }

    pub fn train_accuracy(&self) -> &[f64] {
        &self.train_accuracy
    }

    pub fn validation_accuracy(&self) -> &[f64] {
        &self.validation_accuracy
    }

    pub fn get(&self, epoch: usize) -> Option<EpochMetrics> {
        Some(EpochMetrics {
            epoch,
            train_accuracy: *self.train_accuracy.get(epoch)?,
            validation_accuracy: *self.validation_accuracy.get(epoch)?,
        })
    }

    pub fn last(&self) -> Option<EpochMetrics> {
        self.epochs().checked_sub(1).and_then(|e| self.get(e))
    }

    /// Epoch with the highest validation accuracy (earliest on ties)
    pub fn best_validation(&self) -> Option<EpochMetrics> {
        let (epoch, _) = self
            .validation_accuracy
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &acc)| match best {
                Some((_, b)) if b >= acc => best,
                _ => Some((i, acc)),
            })?;
        self.get(epoch)
    }

    pub fn iter(&self) -> impl Iterator<Item = EpochMetrics> + '_ {
        (0..self.epochs()).filter_map(|e| self.get(e))
    }
}

impl From<(Vec<f64>, Vec<f64>)> for RunMetricsLog {
    fn from((train_accuracy, validation_accuracy): (Vec<f64>, Vec<f64>)) -> Self {
        Self {
            train_accuracy,
            validation_accuracy,
        }
    }
}

impl From<RunMetricsLog> for (Vec<f64>, Vec<f64>) {
    fn from(log: RunMetricsLog) -> Self {
        (log.train_accuracy, log.validation_accuracy)
    }
}
