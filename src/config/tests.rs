//! Integration tests for config module

use super::*;
use crate::train::LossTransform;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_end_to_end_config_loading() {
    let yaml = r#"
schedule:
  max_lr: 0.4
  pct_start: 0.25

optimizer:
  name: sgdwm
  weight_decay: 0.0005

data:
  batch_size: 1024
  micro_batch_size: 128
  train_examples: 5000

training:
  epochs: 20
  loss: normalized_mean_square
"#;

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(yaml.as_bytes()).unwrap();

    let spec = load_config(temp_file.path()).unwrap();
    let config = RunConfig::from_spec(&spec).unwrap();

    assert_eq!(config.accumulation_factor, 8);
    assert_eq!(config.micro_batches_in_epoch, 40);
    assert_eq!(config.total_steps().unwrap(), 100);
    assert_eq!(config.schedule_shape().unwrap().warmup_steps, 25);
    assert_eq!(config.loss, LossTransform::NormalizedMeanSquare);
}

#[test]
fn test_overrides_then_validation() {
    let mut spec = parse_config("training:\n  epochs: 5\n").unwrap();
    let cli = parse_args(["ciclo", "train", "--pct-start", "2.0"]).unwrap();
    let Command::Train(args) = cli.command else {
        panic!("Expected Train command");
    };

    apply_overrides(&mut spec, &args);
    assert!(matches!(
        validate_config(&spec),
        Err(ValidationError::InvalidPctStart(_))
    ));
}

#[test]
fn test_train_from_yaml_writes_record() {
    let dir = TempDir::new().unwrap();
    let yaml = format!(
        r#"
data:
  batch_size: 64
  micro_batch_size: 16
  eval_batch_size: 50
  train_examples: 200
  eval_examples: 100
  features: 4
  classes: 3
  spread: 0.5
  seed: 3

training:
  epochs: 2
  loss: capped_ratio
  output_dir: {}
"#,
        dir.path().display()
    );
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(yaml.as_bytes()).unwrap();

    let outcome = train_from_yaml(temp_file.path()).unwrap();

    // 13 micro-batches per epoch, factor 4: 4 steps per epoch
    assert_eq!(outcome.result.effective_steps, 8);
    assert_eq!(outcome.metrics.epochs(), 2);
    assert!(outcome.record_path.starts_with(dir.path()));
    assert_eq!(
        crate::io::load_run_record(&outcome.record_path).unwrap(),
        outcome.metrics
    );
}
