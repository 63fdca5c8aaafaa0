//! Single-command training from YAML configuration

use super::run::RunConfig;
use super::schema::RunSpec;
use super::validate::validate_config;
use crate::data::SyntheticBlobs;
use crate::error::{Error, Result};
use crate::io::{save_run_record, RecordKey};
use crate::model::SoftmaxClassifier;
use crate::train::{EpochRunner, RunMetricsLog, RunResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub result: RunResult,
    pub metrics: RunMetricsLog,
    /// Where the run record was written
    pub record_path: PathBuf,
}

/// Parse and validate a YAML run specification
pub fn parse_config(yaml: &str) -> Result<RunSpec> {
    let spec: RunSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {}", e)))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;

    Ok(spec)
}

/// Load run spec from YAML file (without running training)
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<RunSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;
    parse_config(&yaml_content)
}

/// Train on the spec's synthetic data and persist the run record
///
/// 1. Derives the immutable [`RunConfig`]
/// 2. Generates the train and evaluation sets
/// 3. Runs every epoch
/// 4. Saves the accuracy history under `training.output_dir`
pub fn train_from_spec(spec: &RunSpec) -> Result<TrainOutcome> {
    let config = RunConfig::from_spec(spec)?;
    let data = &config.data;

    let blobs = SyntheticBlobs::new(data.features, data.classes, data.seed)?.with_spread(data.spread);
    let train = blobs.dataset(
        data.train_examples,
        config.micro_batch_size,
        data.seed.wrapping_add(1),
    )?;
    let eval = blobs.dataset(
        data.eval_examples,
        data.eval_batch_size,
        data.seed.wrapping_add(2),
    )?;
    let mut model = SoftmaxClassifier::new(data.features, data.classes, data.seed);

    let mut runner = EpochRunner::new(&config)?;
    info!(
        optimizer = %config.optimizer,
        loss = %config.loss,
        epochs = config.epochs,
        accumulation_factor = config.accumulation_factor,
        micro_batches = config.micro_batches_in_epoch,
        total_steps = runner.schedule().total_steps(),
        warmup_steps = runner.schedule().shape().warmup_steps,
        "starting run"
    );

    let result = runner.run(&mut model, &train, &eval)?;
    let metrics = runner.into_metrics();
    let record_path = save_run_record(
        &metrics,
        &config.output_dir,
        &RecordKey::from_config(&config),
    )?;
    info!(
        best_valid_acc = result.best_validation_accuracy,
        elapsed_secs = result.elapsed_secs,
        "run finished"
    );

    Ok(TrainOutcome {
        result,
        metrics,
        record_path,
    })
}

/// Train from a YAML configuration file
///
/// # Example
///
/// ```no_run
/// use ciclo::config::train_from_yaml;
///
/// let outcome = train_from_yaml("run.yaml")?;
/// println!("record: {}", outcome.record_path.display());
/// # Ok::<(), ciclo::Error>(())
/// ```
pub fn train_from_yaml<P: AsRef<Path>>(config_path: P) -> Result<TrainOutcome> {
    let spec = load_config(config_path)?;
    train_from_spec(&spec)
}
