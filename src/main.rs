//! Ciclo CLI
//!
//! # Usage
//!
//! ```bash
//! # Train from config
//! ciclo train run.yaml
//!
//! # Train with overrides
//! ciclo train run.yaml --epochs 30 --max-lr 0.4 --loss capped_ratio
//!
//! # Validate config
//! ciclo validate run.yaml --detailed
//!
//! # Print the schedule
//! ciclo plan run.yaml --every 50
//! ```

use ciclo::config::{
    apply_overrides, load_config, train_from_spec, Cli, Command, OutputFormat,
    PlanArgs, RunConfig, RunSpec, TrainArgs, ValidateArgs,
};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Command::Train(args) => run_train(args),
        Command::Validate(args) => run_validate(args),
        Command::Plan(args) => run_plan(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_or_default(path: Option<&Path>) -> Result<RunSpec, String> {
    match path {
        Some(path) => load_config(path).map_err(|e| format!("Config error: {e}")),
        None => Ok(RunSpec::default()),
    }
}

fn run_train(args: TrainArgs) -> Result<(), String> {
    let mut spec = load_or_default(args.config.as_deref())?;
    apply_overrides(&mut spec, &args);

    if args.dry_run {
        let config = RunConfig::from_spec(&spec).map_err(|e| format!("Config error: {e}"))?;
        let total_steps = config
            .total_steps()
            .map_err(|e| format!("Config error: {e}"))?;
        info!(
            optimizer = %config.optimizer,
            loss = %config.loss,
            epochs = config.epochs,
            accumulation_factor = config.accumulation_factor,
            total_steps,
            "dry run: config validated"
        );
        return Ok(());
    }

    let outcome = train_from_spec(&spec).map_err(|e| format!("Training error: {e}"))?;
    println!(
        "Trained {} epochs ({} optimizer steps) in {:.1}s",
        outcome.result.epochs, outcome.result.effective_steps, outcome.result.elapsed_secs
    );
    println!(
        "Final accuracy: train {:.4}, valid {:.4} (best valid {:.4})",
        outcome.result.final_train_accuracy,
        outcome.result.final_validation_accuracy,
        outcome.result.best_validation_accuracy
    );
    println!("Run record: {}", outcome.record_path.display());
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    println!("✓ Configuration valid: {}", args.config.display());

    if args.detailed {
        let config = RunConfig::from_spec(&spec).map_err(|e| format!("Config error: {e}"))?;
        let shape = config
            .schedule_shape()
            .map_err(|e| format!("Config error: {e}"))?;
        println!("  Optimizer: {} (weight decay {})", config.optimizer, config.weight_decay);
        println!("  Loss transform: {}", config.loss);
        println!(
            "  Batch: {} = {} x {} micro-batches",
            config.batch_size, config.accumulation_factor, config.micro_batch_size
        );
        println!("  Micro-batches per epoch: {}", config.micro_batches_in_epoch);
        println!(
            "  Steps: {} total, {} warm-up, {} anneal",
            shape.total_steps, shape.warmup_steps, shape.anneal_steps
        );
        println!(
            "  LR: {} -> {} -> {}",
            shape.initial_lr, shape.max_lr, shape.min_lr
        );
    }
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<(), String> {
    let spec = load_or_default(args.config.as_deref())?;
    let config = RunConfig::from_spec(&spec).map_err(|e| format!("Config error: {e}"))?;
    let schedule = config
        .build_schedule()
        .map_err(|e| format!("Config error: {e}"))?;

    let every = args.every.max(1);
    let last = schedule.total_steps() - 1;
    let points: Vec<_> = schedule
        .table()
        .into_iter()
        .filter(|p| p.step % every == 0 || p.step == last)
        .collect();

    match args.format {
        OutputFormat::Text => {
            println!("{:>8}  {:>12}  {:>8}", "step", "lr", "momentum");
            for p in &points {
                println!("{:>8}  {:>12.6e}  {:>8.4}", p.step, p.lr, p.momentum);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&points)
                .map_err(|e| format!("Serialization error: {e}"))?;
            println!("{json}");
        }
    }
    Ok(())
}
