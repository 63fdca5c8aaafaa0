//! Optimizer trait and the closed set of supported optimizers

use super::{Adam, Sgd};
use crate::error::Error;
use crate::model::Param;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trait for optimization algorithms
///
/// The learning rate and momentum are pushed in from outside before every
/// update; an optimizer never schedules them itself.
pub trait Optimizer {
    /// Apply the accumulated gradients to `params`
    fn step(&mut self, params: &mut [Param]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [Param]) {
        for param in params {
            param.zero_grad();
        }
    }

    fn lr(&self) -> f32;

    fn set_lr(&mut self, lr: f32);

    /// Momentum coefficient (β1 for Adam)
    fn momentum(&self) -> f32;

    fn set_momentum(&mut self, momentum: f32);

    fn weight_decay(&self) -> f32;

    fn name(&self) -> &str;
}

/// Optimizer family, resolved once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Heavy-ball SGD; `sgdwm` is accepted as an alias
    #[default]
    #[serde(alias = "sgdwm")]
    Sgd,
    Adam,
}

impl OptimizerKind {
    /// Construct the optimizer with its initial rate and L2 weight decay
    pub fn build(self, lr: f32, weight_decay: f32) -> Box<dyn Optimizer> {
        match self {
            Self::Sgd => Box::new(Sgd::new(lr, 0.0).with_weight_decay(weight_decay)),
            Self::Adam => Box::new(Adam::default_params(lr).with_weight_decay(weight_decay)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sgd => "sgd",
            Self::Adam => "adam",
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sgd" | "sgdwm" => Ok(Self::Sgd),
            "adam" => Ok(Self::Adam),
            other => Err(Error::ConfigError(format!(
                "unknown optimizer '{other}' (must be one of: sgd, sgdwm, adam)"
            ))),
        }
    }
}
