//! Run record I/O
//!
//! Saves the per-epoch accuracy history of a finished run and reads it back
//! for comparison across hyperparameter choices.

mod record;

pub use record::{load_run_record, save_run_record, write_run_record, RecordKey};
