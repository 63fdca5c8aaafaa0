//! YAML schema definitions for a one-cycle training run

use crate::optim::{OneCycleConfig, OptimizerKind};
use crate::train::LossTransform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete run specification
///
/// Every section is optional; omitted fields take the defaults of a
/// CIFAR-10-sized run (8192-example effective batch in 128-example
/// micro-batches, 150 epochs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    /// One-cycle learning-rate/momentum policy
    #[serde(default)]
    pub schedule: OneCycleConfig,

    /// Optimizer configuration
    #[serde(default)]
    pub optimizer: OptimSpec,

    /// Batch sizes and synthetic dataset shape
    #[serde(default)]
    pub data: DataSpec,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainingParams,
}

/// Optimizer specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimSpec {
    /// `sgd` (alias `sgdwm`) or `adam`
    #[serde(default)]
    pub name: OptimizerKind,

    /// Constructor learning rate; the schedule overwrites it before the first update
    #[serde(default = "default_lr")]
    pub lr: f32,

    /// L2 weight decay
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f32,
}

impl Default for OptimSpec {
    fn default() -> Self {
        Self {
            name: OptimizerKind::default(),
            lr: default_lr(),
            weight_decay: default_weight_decay(),
        }
    }
}

/// Batch sizes and dataset shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    /// Declared (effective) batch size
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Examples per forward/backward pass
    #[serde(default = "default_micro_batch_size")]
    pub micro_batch_size: usize,

    /// Examples per evaluation batch
    #[serde(default = "default_eval_batch_size")]
    pub eval_batch_size: usize,

    #[serde(default = "default_train_examples")]
    pub train_examples: usize,

    #[serde(default = "default_eval_examples")]
    pub eval_examples: usize,

    #[serde(default = "default_features")]
    pub features: usize,

    #[serde(default = "default_classes")]
    pub classes: usize,

    /// Half-width of the uniform noise around each class center
    #[serde(default = "default_spread")]
    pub spread: f32,

    #[serde(default)]
    pub seed: u64,
}

impl Default for DataSpec {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            micro_batch_size: default_micro_batch_size(),
            eval_batch_size: default_eval_batch_size(),
            train_examples: default_train_examples(),
            eval_examples: default_eval_examples(),
            features: default_features(),
            classes: default_classes(),
            spread: default_spread(),
            seed: 0,
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Number of epochs
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Loss reweighting applied to training batches
    #[serde(default = "default_loss")]
    pub loss: LossTransform,

    /// Directory for the run record
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            loss: default_loss(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_lr() -> f32 {
    1.0
}

fn default_weight_decay() -> f32 {
    5e-4
}

fn default_batch_size() -> usize {
    8192
}

fn default_micro_batch_size() -> usize {
    128
}

fn default_eval_batch_size() -> usize {
    100
}

fn default_train_examples() -> usize {
    50_000
}

fn default_eval_examples() -> usize {
    10_000
}

fn default_features() -> usize {
    32
}

fn default_classes() -> usize {
    10
}

fn default_spread() -> f32 {
    1.0
}

fn default_epochs() -> usize {
    150
}

fn default_loss() -> LossTransform {
    LossTransform::MeanSquare
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::AnnealStrategy;

    #[test]
    fn test_deserialize_empty_config() {
        let spec: RunSpec = serde_yaml::from_str("{}").unwrap();
        assert_eq!(spec, RunSpec::default());
        assert_eq!(spec.data.batch_size, 8192);
        assert_eq!(spec.data.micro_batch_size, 128);
        assert_eq!(spec.training.epochs, 150);
        assert_eq!(spec.training.loss, LossTransform::MeanSquare);
        assert_eq!(spec.schedule.pct_start, 0.3);
    }

    #[test]
    fn test_training_loss_default_differs_from_type_default() {
        let params: TrainingParams = serde_yaml::from_str("epochs: 2\n").unwrap();
        assert_eq!(params.loss, LossTransform::MeanSquare);
        assert_eq!(TrainingParams::default().loss, LossTransform::MeanSquare);
        assert_eq!(LossTransform::default(), LossTransform::Identity);
    }

    #[test]
    fn test_deserialize_full_config() {
        let yaml = r#"
schedule:
  max_lr: 0.4
  div_factor: 10
  final_div_factor: 100
  pct_start: 0.25
  base_momentum: 0.8
  max_momentum: 0.9
  anneal_strategy: linear

optimizer:
  name: adam
  lr: 0.001
  weight_decay: 0.0

data:
  batch_size: 512
  micro_batch_size: 64
  eval_batch_size: 50
  train_examples: 4096
  eval_examples: 512
  features: 16
  classes: 4
  spread: 0.5
  seed: 7

training:
  epochs: 3
  loss: capped_ratio
  output_dir: ./runs
"#;

        let spec: RunSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.schedule.max_lr, 0.4);
        assert_eq!(spec.schedule.anneal_strategy, AnnealStrategy::Linear);
        assert_eq!(spec.optimizer.name, OptimizerKind::Adam);
        assert_eq!(spec.data.micro_batch_size, 64);
        assert_eq!(spec.data.seed, 7);
        assert_eq!(spec.training.loss, LossTransform::CappedRatio);
        assert_eq!(spec.training.output_dir, PathBuf::from("./runs"));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let yaml = "schedule:\n  max_lr: 0.2\ntraining:\n  epochs: 5\n";
        let spec: RunSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.schedule.max_lr, 0.2);
        assert_eq!(spec.schedule.div_factor, 25.0);
        assert_eq!(spec.training.epochs, 5);
        assert_eq!(spec.training.loss, LossTransform::MeanSquare);
    }

    #[test]
    fn test_sgdwm_alias() {
        let spec: RunSpec = serde_yaml::from_str("optimizer:\n  name: sgdwm\n").unwrap();
        assert_eq!(spec.optimizer.name, OptimizerKind::Sgd);
    }

    #[test]
    fn test_unknown_loss_is_rejected() {
        let result: Result<RunSpec, _> = serde_yaml::from_str("training:\n  loss: huber\n");
        assert!(result.is_err());
    }
}
