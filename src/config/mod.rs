//! Declarative YAML configuration
//!
//! # Example
//!
//! ```yaml
//! schedule:
//!   max_lr: 0.1
//!   div_factor: 25
//!   final_div_factor: 10000
//!   pct_start: 0.3
//!
//! optimizer:
//!   name: sgd
//!   weight_decay: 0.0005
//!
//! data:
//!   batch_size: 8192
//!   micro_batch_size: 128
//!
//! training:
//!   epochs: 150
//!   loss: mean_square
//! ```

mod cli;
mod run;
mod schema;
mod train;
mod validate;

#[cfg(test)]
mod tests;


pub use cli::{
    apply_overrides, parse_args, Cli, Command, OutputFormat, PlanArgs, TrainArgs, ValidateArgs,
};
pub use run::RunConfig;
pub use schema::{DataSpec, OptimSpec, RunSpec, TrainingParams};
pub use train::{load_config, parse_config, train_from_spec, train_from_yaml, TrainOutcome};
pub use validate::{validate_config, ValidationError};
