// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `annotate`, `evaluate` and `predict`
// and all their configurable flags. Running without a subcommand
// is the same as `train`.
//
// Flags are spelled with underscores (`--data_path`) to match the
// names saved in training_args.json.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::infra::device::DeviceChoice;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune, evaluate on the held-out split, and label the table
    Train(TrainArgs),

    /// Label every row of a CSV with a fine-tuned model
    Annotate(AnnotateArgs),

    /// Score a fine-tuned model on a labelled CSV
    Evaluate(EvaluateArgs),

    /// Classify one or more texts with a fine-tuned model
    Predict(PredictArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// CSV file with a text column and an integer label column
    #[arg(long = "data_path", default_value = "stock_data.csv")]
    pub data_path: String,

    /// Where checkpoints, logs, the final model and the labelled CSV go
    #[arg(long = "output_dir", default_value = "roberta_financial_sentiment")]
    pub output_dir: String,

    /// Local model directory or Hugging Face Hub repo id
    #[arg(long = "model_name", default_value = "roberta-base")]
    pub model_name: String,

    /// Maximum number of tokens per text, special tokens included
    #[arg(long = "max_length", default_value_t = 128)]
    pub max_length: usize,

    /// Texts per batch for training, evaluation and labelling
    #[arg(long = "batch_size", default_value_t = 16)]
    pub batch_size: usize,

    /// Number of full passes through the training split
    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    /// Peak learning rate
    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// AdamW decoupled weight decay
    #[arg(long = "weight_decay", default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Steps of linear warmup before the linear decay
    #[arg(long = "warmup_steps", default_value_t = 0)]
    pub warmup_steps: usize,

    /// Fraction of rows held out for evaluation
    #[arg(long = "test_size", default_value_t = 0.1)]
    pub test_size: f64,

    /// Seed for the split and the batch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Checkpoints kept on disk (0 keeps all); the best is never deleted
    #[arg(long = "save_total_limit", default_value_t = 2)]
    pub save_total_limit: usize,

    /// Log the training loss every N optimiser steps (0 disables)
    #[arg(long = "logging_steps", default_value_t = 50)]
    pub logging_steps: usize,

    #[arg(long = "text_column", default_value = "text")]
    pub text_column: String,

    #[arg(long = "label_column", default_value = "label")]
    pub label_column: String,

    /// Comma-separated label names in class order, e.g. negative,neutral,positive
    #[arg(long = "label_names", value_delimiter = ',')]
    pub label_names: Option<Vec<String>>,

    /// File name of the labelled CSV inside the output directory
    #[arg(long = "output_file", default_value = "stock_data_with_sentiment.csv")]
    pub output_file: String,

    /// auto, cpu, gpu:N or integrated:N
    #[arg(long, default_value = "auto")]
    pub device: DeviceChoice,
}

/// Layer 1 → Layer 2 boundary: the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:        a.data_path,
            output_dir:       a.output_dir,
            model_name:       a.model_name,
            max_length:       a.max_length,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            weight_decay:     a.weight_decay,
            warmup_steps:     a.warmup_steps,
            test_size:        a.test_size,
            seed:             a.seed,
            save_total_limit: a.save_total_limit,
            logging_steps:    a.logging_steps,
            text_column:      a.text_column,
            label_column:     a.label_column,
            label_names:      a.label_names,
            output_file:      a.output_file,
            device:           a.device,
        }
    }
}

/// All arguments for the `annotate` command
#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Directory written by `train`
    #[arg(long = "model_dir")]
    pub model_dir: PathBuf,

    #[arg(long = "data_path")]
    pub data_path: PathBuf,

    #[arg(long = "output_path")]
    pub output_path: PathBuf,

    #[arg(long = "text_column", default_value = "text")]
    pub text_column: String,

    #[arg(long = "batch_size", default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value = "auto")]
    pub device: DeviceChoice,
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by `train`; eval_results.json is saved here
    #[arg(long = "model_dir")]
    pub model_dir: PathBuf,

    #[arg(long = "data_path")]
    pub data_path: PathBuf,

    #[arg(long = "text_column", default_value = "text")]
    pub text_column: String,

    #[arg(long = "label_column", default_value = "label")]
    pub label_column: String,

    #[arg(long = "batch_size", default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value = "auto")]
    pub device: DeviceChoice,
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Directory written by `train`, or one of its checkpoints
    #[arg(long = "model_dir")]
    pub model_dir: PathBuf,

    /// Text to classify; repeat for several
    #[arg(long = "text", required = true)]
    pub texts: Vec<String>,

    #[arg(long, default_value = "auto")]
    pub device: DeviceChoice,
}
