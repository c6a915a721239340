// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All business logic is delegated to Layer 2 (application).
//
//   1. `train`   — trains a network and writes checkpoints
//   2. `predict` — classifies sentences with a checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "senti-qnn",
    version = "0.1.0",
    about = "Train complex-valued sentiment classifiers with lexicon supervision, then classify text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let cfg = args.into_config()?;
    tracing::info!("Starting training on: {}", cfg.train_path);
    let checkpoint_dir = cfg.checkpoint_dir.clone();

    let report = TrainUseCase::new(cfg).execute()?;
    if let (Some(best), Some(last)) = (report.best(), report.last()) {
        println!(
            "Training complete. Best test accuracy {:.4} at epoch {}, final {:.4}. Checkpoints in '{}'.",
            best.test_acc, best.epoch, last.test_acc, checkpoint_dir
        );
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case    = PredictUseCase::new(&args.checkpoint_dir)?;
    let predictions = use_case.classify_all(&args.text)?;

    for (text, p) in args.text.iter().zip(&predictions) {
        println!("{:<8} {:.4}  {}", p.label_name(), p.confidence(), text);
    }
    Ok(())
}
