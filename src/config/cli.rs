//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! ciclo train run.yaml
//! ciclo train run.yaml --epochs 30 --max-lr 0.4 --loss capped_ratio
//! ciclo train --batch-size 512 --micro-batch-size 64
//! ciclo train --div-factor 10 --final-div 100 --weight-decay 0.0001
//! ciclo validate run.yaml
//! ciclo plan run.yaml --every 50
//! ```

use super::schema::RunSpec;
use crate::optim::OptimizerKind;
use crate::train::LossTransform;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ciclo: one-cycle training with gradient accumulation
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "ciclo")]
#[command(version)]
#[command(about = "One-cycle learning-rate training with gradient accumulation")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (per-step logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train from a YAML configuration (defaults when omitted)
    Train(TrainArgs),

    /// Validate a configuration file without training
    Validate(ValidateArgs),

    /// Print the learning-rate/momentum schedule a configuration produces
    Plan(PlanArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Override output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override declared batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Override micro-batch size
    #[arg(long)]
    pub micro_batch_size: Option<usize>,

    /// Override peak learning rate
    #[arg(long)]
    pub max_lr: Option<f32>,

    /// Override fraction of steps spent warming up
    #[arg(long)]
    pub pct_start: Option<f32>,

    /// Override `max_lr / initial_lr`
    #[arg(long)]
    pub div_factor: Option<f32>,

    /// Override `initial_lr / min_lr`
    #[arg(long = "final-div")]
    pub final_div_factor: Option<f32>,

    /// Override optimizer constructor learning rate
    #[arg(long)]
    pub lr: Option<f32>,

    /// Override L2 weight decay
    #[arg(long)]
    pub weight_decay: Option<f32>,

    /// Override loss transform (name or selector 0-3)
    #[arg(long)]
    pub loss: Option<LossTransform>,

    /// Override optimizer (sgd, sgdwm, adam)
    #[arg(long)]
    pub optimizer: Option<OptimizerKind>,

    /// Random seed for data and initialisation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Dry run (validate config but don't train)
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Show the derived run layout
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the plan command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PlanArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Print every Nth step (the last step is always printed)
    #[arg(long, default_value = "1")]
    pub every: usize,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for the plan command
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown output format: {}. Valid formats: text, json",
                s
            )),
        }
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a RunSpec
pub fn apply_overrides(spec: &mut RunSpec, args: &TrainArgs) {
    if let Some(output_dir) = &args.output_dir {
        spec.training.output_dir = output_dir.clone();
    }
    if let Some(epochs) = args.epochs {
        spec.training.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        spec.data.batch_size = batch_size;
    }
    if let Some(micro_batch_size) = args.micro_batch_size {
        spec.data.micro_batch_size = micro_batch_size;
    }
    if let Some(max_lr) = args.max_lr {
        spec.schedule.max_lr = max_lr;
    }
    if let Some(pct_start) = args.pct_start {
        spec.schedule.pct_start = pct_start;
    }
    if let Some(div_factor) = args.div_factor {
        spec.schedule.div_factor = div_factor;
    }
    if let Some(final_div_factor) = args.final_div_factor {
        spec.schedule.final_div_factor = final_div_factor;
    }
    if let Some(lr) = args.lr {
        spec.optimizer.lr = lr;
    }
    if let Some(weight_decay) = args.weight_decay {
        spec.optimizer.weight_decay = weight_decay;
    }
    if let Some(loss) = args.loss {
        spec.training.loss = loss;
    }
    if let Some(optimizer) = args.optimizer {
        spec.optimizer.name = optimizer;
    }
    if let Some(seed) = args.seed {
        spec.data.seed = seed;
    }
}
