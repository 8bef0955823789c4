// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
//   fin-sentiment [train flags]        — full pipeline (default)
//   fin-sentiment train [flags]        — same, spelled out
//   fin-sentiment annotate ...         — label a CSV with a saved model
//   fin-sentiment evaluate ...         — score a saved model
//   fin-sentiment predict ...          — classify texts given as flags
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{AnnotateArgs, Commands, EvaluateArgs, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "fin-sentiment",
    version,
    about = "Fine-tune a RoBERTa encoder for financial sentiment and label a CSV with it.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Flags for the default (train) pipeline
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Some(Commands::Train(args))    => run_train(args),
            Some(Commands::Annotate(args)) => run_annotate(args),
            Some(Commands::Evaluate(args)) => run_evaluate(args),
            Some(Commands::Predict(args))  => run_predict(args),
            None                           => run_train(self.train),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Fine-tuning '{}' on '{}'", args.model_name, args.data_path);
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete.");
    println!("  labels:          {}", summary.num_labels);
    println!("  train / test:    {} / {}", summary.train_rows, summary.test_rows);
    if let Some(best) = &summary.best_checkpoint {
        println!("  best checkpoint: {best}");
    }
    print_metrics(&summary.held_out);
    println!("Labelled data written to {}", summary.output_csv.display());
    Ok(())
}

fn run_annotate(args: AnnotateArgs) -> Result<()> {
    use crate::application::annotate_use_case::AnnotateUseCase;

    let use_case = AnnotateUseCase {
        model_dir:   args.model_dir,
        data_path:   args.data_path,
        output_path: args.output_path,
        text_column: args.text_column,
        batch_size:  args.batch_size,
        device:      args.device,
    };
    let rows = use_case.execute()?;
    println!("Labelled {} rows → {}", rows, use_case.output_path.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase {
        model_dir:    args.model_dir,
        data_path:    args.data_path,
        text_column:  args.text_column,
        label_column: args.label_column,
        batch_size:   args.batch_size,
        device:       args.device,
    }
    .execute()?;
    print_metrics(&report);
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::load(&args.model_dir, &args.device)?;
    for text in &args.texts {
        let p = use_case.predict(text)?;
        println!("{:<10} {:.4}  {}", p.label, p.score, text);
    }
    Ok(())
}

fn print_metrics(report: &crate::ml::evaluation::EvalReport) {
    println!("  eval_loss:       {:.4}", report.loss);
    for (name, value) in report.metrics.to_map() {
        println!("  {:<16} {:.4}", format!("{name}:"), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::infra::device::DeviceChoice;

    #[test]
    fn test_no_subcommand_uses_train_defaults() {
        let cli = Cli::try_parse_from(["fin-sentiment"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(TrainConfig::from(cli.train), TrainConfig::default());
    }

    #[test]
    fn test_underscore_flags() {
        let cli = Cli::try_parse_from([
            "fin-sentiment",
            "--data_path", "news.csv",
            "--max_length", "64",
            "--label_names", "negative,neutral,positive",
            "--device", "gpu:1",
        ])
        .unwrap();
        let cfg = TrainConfig::from(cli.train);
        assert_eq!(cfg.data_path, "news.csv");
        assert_eq!(cfg.max_length, 64);
        assert_eq!(cfg.label_names.unwrap(), vec!["negative", "neutral", "positive"]);
        assert_eq!(cfg.device, DeviceChoice::Discrete(1));
    }

    #[test]
    fn test_annotate_subcommand() {
        let cli = Cli::try_parse_from([
            "fin-sentiment", "annotate",
            "--model_dir", "out",
            "--data_path", "in.csv",
            "--output_path", "labelled.csv",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Annotate(a)) => {
                assert_eq!(a.model_dir.to_str(), Some("out"));
                assert_eq!(a.batch_size, 16);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_predict_subcommand_takes_repeated_text() {
        let cli = Cli::try_parse_from([
            "fin-sentiment", "predict",
            "--model_dir", "out/checkpoint-57",
            "--text", "stocks rise",
            "--text", "stocks fall",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Predict(p)) => {
                assert_eq!(p.texts, vec!["stocks rise", "stocks fall"]);
                assert_eq!(p.device, DeviceChoice::Auto);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["fin-sentiment", "predict", "--model_dir", "out"]).is_err());
    }

    #[test]
    fn test_bad_device_is_rejected() {
        assert!(Cli::try_parse_from(["fin-sentiment", "--device", "tpu"]).is_err());
    }
}
