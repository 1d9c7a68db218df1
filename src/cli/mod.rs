// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application); this layer
// only routes and prints.
//
//   (no subcommand) — full pipeline with the fixed defaults
//   `train`         — same pipeline, flags override defaults
//   `evaluate`      — re-score with the best saved checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs};

use crate::application::train_use_case::TrainConfig;

#[derive(Parser, Debug)]
#[command(
    name = "elmo-classifier",
    version,
    about = "Fine-tune an ELMo sentence embedder with a dense head for binary text classification."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            None => run_train(TrainConfig::default()),
            Some(Commands::Train(args)) => run_train(args.into()),
            Some(Commands::Evaluate(args)) => run_evaluate(args),
        }
    }
}

fn run_train(config: TrainConfig) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on '{}'", config.train_path);
    let report = TrainUseCase::new(config).execute()?;

    match &report.best {
        Some(best) => tracing::info!("Best checkpoint: {} (epoch {})", best.file, best.epoch),
        None => tracing::warn!("No epoch produced a checkpoint"),
    }
    print!("{}", report.evaluation);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let evaluation = EvaluateUseCase::new(&args.model_dir, args.test_path).execute()?;
    print!("{}", evaluation);
    Ok(())
}
