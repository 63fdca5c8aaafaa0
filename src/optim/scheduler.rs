//! One-cycle learning rate and momentum schedule
//!
//! The schedule is a pure function of the effective-step index: callers own
//! the step counter and ask for the rate/momentum pair of a given step.
//!
//! ```text
//!  lr
//!  max_lr  |        ___
//!          |      /     \
//!          |    /         \
//!  init_lr |__/             \___
//!  min_lr  |                    ‾‾
//!          +---------+-----------+--> step
//!          0      warmup     total-1
//! ```
//!
//! Momentum mirrors the rate: it falls from `max_momentum` to
//! `base_momentum` during warm-up and rises back while the rate anneals.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Shape of the progress curve used inside each phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnealStrategy {
    /// Half-cosine: `(1 - cos(π·t)) / 2`
    #[default]
    Cos,
    /// Straight line: `t`
    Linear,
}

impl AnnealStrategy {
    /// Map linear phase progress `t ∈ [0, 1]` onto the curve
    pub fn progress(self, t: f32) -> f32 {
        match self {
            Self::Cos => (1.0 - (PI * t).cos()) / 2.0,
            Self::Linear => t,
        }
    }
}

/// One-cycle hyperparameters, independent of the step budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneCycleConfig {
    /// Peak learning rate, reached at the end of warm-up
    pub max_lr: f32,
    /// `initial_lr = max_lr / div_factor`
    pub div_factor: f32,
    /// `min_lr = initial_lr / final_div_factor`
    pub final_div_factor: f32,
    /// Fraction of the step budget spent rising
    pub pct_start: f32,
    /// Momentum at peak learning rate
    pub base_momentum: f32,
    /// Momentum at the start and end of the cycle
    pub max_momentum: f32,
    pub anneal_strategy: AnnealStrategy,
}

impl Default for OneCycleConfig {
    fn default() -> Self {
        Self {
            max_lr: 0.1,
            div_factor: 25.0,
            final_div_factor: 1e4,
            pct_start: 0.3,
            base_momentum: 0.85,
            max_momentum: 0.95,
            anneal_strategy: AnnealStrategy::Cos,
        }
    }
}

/// Phase boundaries and anchor values of a one-cycle run
///
/// Immutable once built. `0 < initial_lr ≤ max_lr` and `min_lr ≤ initial_lr`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleShape {
    pub total_steps: usize,
    pub warmup_steps: usize,
    pub anneal_steps: usize,
    pub initial_lr: f32,
    pub max_lr: f32,
    pub min_lr: f32,
    pub low_momentum: f32,
    pub high_momentum: f32,
    pub strategy: AnnealStrategy,
}

impl ScheduleShape {
    /// Derive the shape for a budget of `total_steps` effective steps
    pub fn new(total_steps: usize, config: &OneCycleConfig) -> Result<Self> {
        if total_steps == 0 {
            return Err(Error::ConfigError(
                "one-cycle schedule needs at least one step".to_string(),
            ));
        }
        if !(config.max_lr > 0.0 && config.max_lr.is_finite()) {
            return Err(Error::ConfigError(format!(
                "max_lr must be positive and finite (got {})",
                config.max_lr
            )));
        }
        if !(config.div_factor >= 1.0 && config.div_factor.is_finite()) {
            return Err(Error::ConfigError(format!(
                "div_factor must be >= 1 (got {})",
                config.div_factor
            )));
        }
        if !(config.final_div_factor >= 1.0 && config.final_div_factor.is_finite()) {
            return Err(Error::ConfigError(format!(
                "final_div_factor must be >= 1 (got {})",
                config.final_div_factor
            )));
        }
        if !(0.0..=1.0).contains(&config.pct_start) {
            return Err(Error::ConfigError(format!(
                "pct_start must be in [0, 1] (got {})",
                config.pct_start
            )));
        }
        if !(0.0 <= config.base_momentum
            && config.base_momentum <= config.max_momentum
            && config.max_momentum < 1.0)
        {
            return Err(Error::ConfigError(format!(
                "momentum bounds must satisfy 0 <= base ({}) <= max ({}) < 1",
                config.base_momentum, config.max_momentum
            )));
        }

        let warmup_steps =
            ((config.pct_start as f64 * total_steps as f64).round() as usize).min(total_steps);
        let initial_lr = config.max_lr / config.div_factor;

        Ok(Self {
            total_steps,
            warmup_steps,
            anneal_steps: total_steps - warmup_steps,
            initial_lr,
            max_lr: config.max_lr,
            min_lr: initial_lr / config.final_div_factor,
            low_momentum: config.base_momentum,
            high_momentum: config.max_momentum,
            strategy: config.anneal_strategy,
        })
    }
}

/// Rate and momentum at one step, as listed by [`OneCycleSchedule::table`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchedulePoint {
    pub step: usize,
    pub lr: f32,
    pub momentum: f32,
}

/// One-cycle schedule: warm-up from `initial_lr` to `max_lr`, then anneal
/// down to `min_lr`, each phase following the configured progress curve
///
/// # Example
///
/// ```
/// use ciclo::optim::{OneCycleConfig, OneCycleSchedule, ScheduleShape};
///
/// let shape = ScheduleShape::new(1050, &OneCycleConfig::default()).unwrap();
/// let schedule = OneCycleSchedule::new(shape);
///
/// let (lr, momentum) = schedule.rate_and_momentum(0).unwrap();
/// assert_eq!(lr, 0.1 / 25.0);
/// assert_eq!(momentum, 0.95);
/// assert!(schedule.rate_and_momentum(1050).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneCycleSchedule {
    shape: ScheduleShape,
}

impl OneCycleSchedule {
    pub fn new(shape: ScheduleShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> &ScheduleShape {
        &self.shape
    }

    pub fn total_steps(&self) -> usize {
        self.shape.total_steps
    }

    /// Learning rate and momentum for effective step `step`
    ///
    /// Fails with [`Error::ScheduleExhausted`] when `step >= total_steps`.
    pub fn rate_and_momentum(&self, step: usize) -> Result<(f32, f32)> {
        let s = &self.shape;
        if step >= s.total_steps {
            return Err(Error::ScheduleExhausted {
                step,
                total_steps: s.total_steps,
            });
        }

        if step < s.warmup_steps {
            let t = step as f32 / s.warmup_steps as f32;
            let progress = s.strategy.progress(t);
            Ok((
                s.initial_lr + progress * (s.max_lr - s.initial_lr),
                s.high_momentum - progress * (s.high_momentum - s.low_momentum),
            ))
        } else {
            // The last step of the run lands exactly on min_lr.
            let span = s.anneal_steps.saturating_sub(1).max(1);
            let t = ((step - s.warmup_steps) as f32 / span as f32).clamp(0.0, 1.0);
            let progress = s.strategy.progress(t);
            Ok((
                s.max_lr + progress * (s.min_lr - s.max_lr),
                s.low_momentum + progress * (s.high_momentum - s.low_momentum),
            ))
        }
    }

    /// Every step of the schedule in order
    pub fn table(&self) -> Vec<SchedulePoint> {
        (0..self.shape.total_steps)
            .filter_map(|step| {
                self.rate_and_momentum(step)
                    .ok()
                    .map(|(lr, momentum)| SchedulePoint { step, lr, momentum })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use proptest::prelude::*;

    fn schedule(total_steps: usize, config: OneCycleConfig) -> OneCycleSchedule {
        OneCycleSchedule::new(ScheduleShape::new(total_steps, &config).unwrap())
    }

    #[test]
    fn test_shape_for_cifar_run() {
        // 391 micro-batches, accumulation 64 -> 7 steps/epoch, 150 epochs
        let shape = ScheduleShape::new(7 * 150, &OneCycleConfig::default()).unwrap();
        assert_eq!(shape.total_steps, 1050);
        assert_eq!(shape.warmup_steps, 315);
        assert_eq!(shape.anneal_steps, 735);
        assert_relative_eq!(shape.initial_lr, 0.004);
        assert_relative_eq!(shape.min_lr, 4e-7);
    }

    #[test]
    fn test_anchor_values() {
        let s = schedule(1050, OneCycleConfig::default());
        let shape = *s.shape();

        let (lr, m) = s.rate_and_momentum(0).unwrap();
        assert_eq!(lr, shape.initial_lr);
        assert_eq!(m, shape.high_momentum);

        let (lr, m) = s.rate_and_momentum(shape.warmup_steps).unwrap();
        assert_abs_diff_eq!(lr, shape.max_lr, epsilon = 1e-7);
        assert_abs_diff_eq!(m, shape.low_momentum, epsilon = 1e-7);

        let (lr, m) = s.rate_and_momentum(1049).unwrap();
        assert_abs_diff_eq!(lr, shape.min_lr, epsilon = 1e-7);
        assert_abs_diff_eq!(m, shape.high_momentum, epsilon = 1e-6);
    }

    #[test]
    fn test_warmup_midpoint_is_halfway() {
        let s = schedule(200, OneCycleConfig::default());
        let shape = *s.shape();
        assert_eq!(shape.warmup_steps, 60);

        // cos(π/2) = 0 -> progress 0.5
        let (lr, m) = s.rate_and_momentum(30).unwrap();
        assert_abs_diff_eq!(lr, (shape.initial_lr + shape.max_lr) / 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(m, 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_linear_strategy() {
        let config = OneCycleConfig {
            anneal_strategy: AnnealStrategy::Linear,
            pct_start: 0.5,
            ..OneCycleConfig::default()
        };
        let s = schedule(20, config);
        let (lr, _) = s.rate_and_momentum(5).unwrap();
        let shape = s.shape();
        assert_abs_diff_eq!(
            lr,
            shape.initial_lr + 0.5 * (shape.max_lr - shape.initial_lr),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_exhausted_schedule_is_an_error() {
        let s = schedule(10, OneCycleConfig::default());
        assert!(s.rate_and_momentum(9).is_ok());
        let err = s.rate_and_momentum(10).unwrap_err();
        assert!(matches!(
            err,
            Error::ScheduleExhausted {
                step: 10,
                total_steps: 10
            }
        ));
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let s = schedule(1050, OneCycleConfig::default());
        for step in [0, 1, 314, 315, 700, 1049] {
            assert_eq!(
                s.rate_and_momentum(step).unwrap(),
                s.rate_and_momentum(step).unwrap()
            );
        }
    }

    #[test]
    fn test_no_warmup_starts_at_peak() {
        let config = OneCycleConfig {
            pct_start: 0.0,
            ..OneCycleConfig::default()
        };
        let s = schedule(10, config);
        assert_eq!(s.shape().warmup_steps, 0);
        let (lr, m) = s.rate_and_momentum(0).unwrap();
        assert_eq!(lr, 0.1);
        assert_eq!(m, 0.85);
    }

    #[test]
    fn test_full_warmup_never_anneals() {
        let config = OneCycleConfig {
            pct_start: 1.0,
            ..OneCycleConfig::default()
        };
        let s = schedule(10, config);
        assert_eq!(s.shape().anneal_steps, 0);
        let (lr, _) = s.rate_and_momentum(9).unwrap();
        assert!(lr < 0.1);
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        let bad = [
            OneCycleConfig {
                pct_start: 1.5,
                ..OneCycleConfig::default()
            },
            OneCycleConfig {
                pct_start: f32::NAN,
                ..OneCycleConfig::default()
            },
            OneCycleConfig {
                final_div_factor: 0.5,
                ..OneCycleConfig::default()
            },
            OneCycleConfig {
                max_lr: 0.0,
                ..OneCycleConfig::default()
            },
            OneCycleConfig {
                base_momentum: 0.99,
                ..OneCycleConfig::default()
            },
        ];
        for config in bad {
            assert!(ScheduleShape::new(100, &config).is_err(), "{config:?}");
        }
        assert!(ScheduleShape::new(0, &OneCycleConfig::default()).is_err());
    }

    #[test]
    fn test_table_covers_every_step() {
        let s = schedule(25, OneCycleConfig::default());
        let table = s.table();
        assert_eq!(table.len(), 25);
        assert_eq!(table[0].step, 0);
        assert_eq!(table[24].step, 24);
    }

    proptest! {
        #[test]
        fn prop_lr_rises_then_falls(
            total_steps in 4usize..3000,
            pct_start in 0.05f32..0.95,
            max_lr in 1e-4f32..10.0,
            div_factor in 1.0f32..100.0,
            final_div_factor in 1.0f32..1e5,
        ) {
            let config = OneCycleConfig {
                max_lr,
                div_factor,
                final_div_factor,
                pct_start,
                ..OneCycleConfig::default()
            };
            let s = schedule(total_steps, config);
            let warmup = s.shape().warmup_steps;
            let tol = max_lr * 1e-5;

            let mut prev = s.rate_and_momentum(0).unwrap();
            for step in 1..total_steps {
                let cur = s.rate_and_momentum(step).unwrap();
                if step <= warmup {
                    prop_assert!(cur.0 >= prev.0 - tol, "lr fell during warm-up at {}", step);
                    prop_assert!(cur.1 <= prev.1 + 1e-6, "momentum rose during warm-up at {}", step);
                } else {
                    prop_assert!(cur.0 <= prev.0 + tol, "lr rose during anneal at {}", step);
                    prop_assert!(cur.1 >= prev.1 - 1e-6, "momentum fell during anneal at {}", step);
                }
                prev = cur;
            }
        }

        #[test]
        fn prop_values_stay_within_anchors(
            total_steps in 1usize..2000,
            pct_start in 0.0f32..=1.0,
        ) {
            let config = OneCycleConfig { pct_start, ..OneCycleConfig::default() };
            let s = schedule(total_steps, config);
            let shape = *s.shape();
            for point in s.table() {
                prop_assert!(point.lr >= shape.min_lr - 1e-7 && point.lr <= shape.max_lr + 1e-7);
                prop_assert!(point.momentum >= shape.low_momentum - 1e-6);
                prop_assert!(point.momentum <= shape.high_momentum + 1e-6);
            }
        }
    }
}
