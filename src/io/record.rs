//! Run record persistence
//!
//! A run record is the JSON pair `[train_accuracy_by_epoch, validation_accuracy_by_epoch]`
//! written once at run end, in a file named after the run's hyperparameters.

use crate::config::RunConfig;
use crate::optim::OptimizerKind;
use crate::train::{LossTransform, RunMetricsLog};
use crate::{Error, Result};
use chrono::{DateTime, Local, TimeZone};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Hyperparameters that identify a run record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordKey {
    pub optimizer: OptimizerKind,
    pub initial_lr: f32,
    pub max_lr: f32,
    pub epochs: usize,
    pub batch_size: usize,
    pub pct_start: f32,
    pub loss: LossTransform,
}

impl RecordKey {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            optimizer: config.optimizer,
            initial_lr: config.schedule.max_lr / config.schedule.div_factor,
            max_lr: config.schedule.max_lr,
            epochs: config.epochs,
            batch_size: config.batch_size,
            pct_start: config.schedule.pct_start,
            loss: config.loss,
        }
    }

    /// `<opt><initial_lr>-<max_lr>-epoch<N>-batchsize<B>-pct<p>-<timestamp>-loss<code>_onecycle_log.json`
    pub fn file_name<Tz>(&self, timestamp: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{}{}-{}-epoch{}-batchsize{}-pct{}-{}-loss{}_onecycle_log.json",
            self.optimizer,
            self.initial_lr,
            self.max_lr,
            self.epochs,
            self.batch_size,
            self.pct_start,
            timestamp.format("%Y-%m-%d_%H-%M-%S"),
            self.loss.code()
        )
    }
}

/// Write `log` to `path` as JSON
pub fn write_run_record(log: &RunMetricsLog, path: impl AsRef<Path>) -> Result<()> {
    let data = serde_json::to_string(log)
        .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
    let mut file = File::create(path.as_ref())?;
    file.write_all(data.as_bytes())?;
    Ok(())
}

/// Write `log` into `dir` under a timestamped name; returns the file path
pub fn save_run_record(
    log: &RunMetricsLog,
    dir: impl AsRef<Path>,
    key: &RecordKey,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(key.file_name(&Local::now()));
    write_run_record(log, &path)?;
    info!(path = %path.display(), epochs = log.epochs(), "run record saved");
    Ok(path)
}

/// Read a run record back
pub fn load_run_record(path: impl AsRef<Path>) -> Result<RunMetricsLog> {
    let mut content = String::new();
    File::open(path.as_ref())?.read_to_string(&mut content)?;
    let log: RunMetricsLog = serde_json::from_str(&content)
        .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?;
    if log.train_accuracy().len() != log.validation_accuracy().len() {
        return Err(Error::Serialization(format!(
            "run record has {} train and {} validation epochs",
            log.train_accuracy().len(),
            log.validation_accuracy().len()
        )));
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunSpec;
    use chrono::Utc;
    use tempfile::TempDir;

    fn key() -> RecordKey {
        RecordKey::from_config(&RunConfig::from_spec(&RunSpec::default()).unwrap())
    }

    #[test]
    fn test_file_name_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            key().file_name(&ts),
            "sgd0.004-0.1-epoch150-batchsize8192-pct0.3-2024-03-09_14-05-07-loss1_onecycle_log.json"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut log = RunMetricsLog::new();
        log.push(0.5, 0.25);
        log.push(0.75, 0.5);

        let path = save_run_record(&log, dir.path().join("runs"), &key()).unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("-loss1_onecycle_log.json")));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[[0.5,0.75],[0.25,0.5]]");
        assert_eq!(load_run_record(&path).unwrap(), log);
    }

    #[test]
    fn test_load_rejects_ragged_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ragged.json");
        std::fs::write(&path, "[[0.5,0.6],[0.4]]").unwrap();
        assert!(matches!(
            load_run_record(&path),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_run_record(dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }
}
