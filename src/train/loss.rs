//! Per-example cross entropy and the loss-reweighting transforms
//!
//! Every transform reduces a batch of per-example cross-entropy losses `ℓ_i`
//! to one scalar:
//!
//! | transform                | value                          |
//! |--------------------------|--------------------------------|
//! | `identity`               | `mean(ℓ)`                      |
//! | `mean_square`            | `mean(ℓ²)`                     |
//! | `normalized_mean_square` | `Σℓ² / Σℓ`                     |
//! | `capped_ratio`           | `mean(ℓ²) / max(mean(ℓ), 1)`   |

use crate::error::{Error, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reduction from per-example losses to the training loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossTransform {
    /// Plain cross-entropy average; always used for evaluation
    #[default]
    Identity,
    /// Squares each loss, weighting hard examples more heavily
    MeanSquare,
    /// Loss-weighted average of the losses themselves
    NormalizedMeanSquare,
    /// `mean_square` while the mean loss is below 1, `normalized_mean_square` above
    CappedRatio,
}

struct Sums {
    n: f64,
    sum: f64,
    sum_sq: f64,
}

impl LossTransform {
    pub const ALL: [LossTransform; 4] = [
        Self::Identity,
        Self::MeanSquare,
        Self::NormalizedMeanSquare,
        Self::CappedRatio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::MeanSquare => "mean_square",
            Self::NormalizedMeanSquare => "normalized_mean_square",
            Self::CappedRatio => "capped_ratio",
        }
    }

    /// Numeric selector used in run-record file names
    pub fn code(self) -> u8 {
        match self {
            Self::Identity => 0,
            Self::MeanSquare => 1,
            Self::NormalizedMeanSquare => 2,
            Self::CappedRatio => 3,
        }
    }

    fn sums(losses: &[f32]) -> Result<Sums> {
        if losses.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for &l in losses {
            if !l.is_finite() {
                return Err(Error::NonFiniteLoss { value: l });
            }
            let l = l as f64;
            sum += l;
            sum_sq += l * l;
        }
        Ok(Sums {
            n: losses.len() as f64,
            sum,
            sum_sq,
        })
    }

    /// Reduce per-example losses to one scalar training loss
    ///
    /// Fails on an empty batch or when any loss, or the result, is not finite.
    pub fn reduce(self, losses: &[f32]) -> Result<f32> {
        let Sums { n, sum, sum_sq } = Self::sums(losses)?;
        let value = match self {
            Self::Identity => sum / n,
            Self::MeanSquare => sum_sq / n,
            Self::NormalizedMeanSquare => ratio(sum_sq, sum),
            Self::CappedRatio => (sum_sq / n) / (sum / n).max(1.0),
        } as f32;

        if !value.is_finite() {
            return Err(Error::NonFiniteLoss { value });
        }
        Ok(value)
    }

    /// Partial derivatives of [`reduce`](Self::reduce) with respect to each `ℓ_i`
    pub fn gradient_weights(self, losses: &[f32]) -> Result<Vec<f32>> {
        let Sums { n, sum, sum_sq } = Self::sums(losses)?;

        // d(Σℓ²/Σℓ)/dℓ_i = (2ℓ_i·Σℓ − Σℓ²) / (Σℓ)²
        let normalized = |l: f64| {
            if sum == 0.0 {
                0.0
            } else {
                (2.0 * l * sum - sum_sq) / (sum * sum)
            }
        };

        let weights = losses
            .iter()
            .map(|&l| {
                let l = l as f64;
                let w = match self {
                    Self::Identity => 1.0 / n,
                    Self::MeanSquare => 2.0 * l / n,
                    Self::NormalizedMeanSquare => normalized(l),
                    // Above the floor mean(ℓ²)/mean(ℓ) equals Σℓ²/Σℓ
                    Self::CappedRatio if sum / n > 1.0 => normalized(l),
                    Self::CappedRatio => 2.0 * l / n,
                };
                w as f32
            })
            .collect();
        Ok(weights)
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    // All-zero losses: the loss-weighted average of zeros is zero.
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

impl fmt::Display for LossTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LossTransform {
    type Err = Error;

    /// Accepts transform names and the numeric selectors `0`–`3`
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "identity" | "cross_entropy" | "0" => Ok(Self::Identity),
            "mean_square" | "1" => Ok(Self::MeanSquare),
            "normalized_mean_square" | "2" => Ok(Self::NormalizedMeanSquare),
            "capped_ratio" | "3" => Ok(Self::CappedRatio),
            other => Err(Error::ConfigError(format!(
                "unknown loss transform '{other}' (must be one of: identity, mean_square, \
                 normalized_mean_square, capped_ratio)"
            ))),
        }
    }
}

/// Per-example cross entropy of a batch of logits
#[derive(Debug, Clone)]
pub struct CrossEntropy {
    /// `ℓ_i = logsumexp(z_i) − z_i[y_i]`
    pub losses: Vec<f32>,
    /// `∂ℓ_i/∂z_i = softmax(z_i) − onehot(y_i)`, one row per example
    pub logit_grad: Array2<f32>,
}

impl CrossEntropy {
    /// Compute losses and logit gradients for `labels`
    pub fn compute(logits: &Array2<f32>, labels: &[usize]) -> Result<Self> {
        let (rows, classes) = logits.dim();
        if rows != labels.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![rows],
                got: vec![labels.len()],
            });
        }
        if let Some(&bad) = labels.iter().find(|&&y| y >= classes) {
            return Err(Error::ShapeMismatch {
                expected: vec![classes],
                got: vec![bad + 1],
            });
        }

        let mut losses = Vec::with_capacity(rows);
        let mut logit_grad = Array2::zeros((rows, classes));

        for ((row, mut grad_row), &label) in logits
            .axis_iter(Axis(0))
            .zip(logit_grad.axis_iter_mut(Axis(0)))
            .zip(labels)
        {
            let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            let exp = row.mapv(|z| (z - max).exp());
            let sum = exp.sum();
            let log_sum_exp = max + sum.ln();

            let loss = log_sum_exp - row[label];
            if !loss.is_finite() {
                return Err(Error::NonFiniteLoss { value: loss });
            }
            losses.push(loss.max(0.0));

            grad_row.assign(&(exp / sum));
            grad_row[label] -= 1.0;
        }

        Ok(Self { losses, logit_grad })
    }

    /// Scale each example's gradient row by `weights[i]`
    pub fn weighted_grad(&self, weights: &[f32]) -> Result<Array2<f32>> {
        if weights.len() != self.losses.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.losses.len()],
                got: vec![weights.len()],
            });
        }
        let mut grad = self.logit_grad.clone();
        for (mut row, &w) in grad.axis_iter_mut(Axis(0)).zip(weights) {
            row *= w;
        }
        Ok(grad)
    }
}
