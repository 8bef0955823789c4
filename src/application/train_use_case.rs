// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full fine-tuning pipeline in order:
//
//   Step 1: Load the CSV table              (Layer 4 - data)
//   Step 2: Build the label space           (Layer 3 - domain)
//   Step 3: Stratified train / test split   (Layer 4 - data)
//   Step 4: Resolve the pretrained model    (Layer 6 - infra)
//   Step 5: Build datasets                  (Layer 4 - data)
//   Step 6: Save config                     (Layer 6 - infra)
//   Step 7: Run training loop               (Layer 5 - ml)
//   Step 8: Save the fine-tuned model       (Layer 6 - infra)
//   Step 9: Evaluate on the held-out split  (Layer 2 - evaluate)
//   Step 10: Annotate the full table        (Layer 2 - annotate)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{
    backend::{Autodiff, Wgpu},
    module::AutodiffModule,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::{
    annotate_use_case::annotate_table,
    evaluate_use_case::{evaluate_classifier, write_eval_results},
};
use crate::data::{
    dataset::{truncating_tokenizer, SentimentDataset},
    error::DataError,
    splitter::stratified_split,
    table::CorpusTable,
};
use crate::domain::record::{LabelSpace, Record};
use crate::infra::{
    checkpoint::CheckpointManager,
    device::DeviceChoice,
    model_store::{save_pretrained, ModelFiles, ModelMeta, PretrainedConfig},
    tokenizer_store::{resolve_pad_id, TokenizerStore},
};
use crate::ml::{
    evaluation::EvalReport,
    inferencer::Inferencer,
    model::SentimentModelConfig,
    trainer::run_training,
    weights::load_model,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run.
// Serialisable so it can be saved next to the model as
// training_args.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:        String,
    pub output_dir:       String,
    pub model_name:       String,
    pub max_length:       usize,
    pub batch_size:       usize,
    pub epochs:           usize,
    pub lr:               f64,
    pub weight_decay:     f64,
    pub warmup_steps:     usize,
    pub test_size:        f64,
    pub seed:             u64,
    pub save_total_limit: usize,
    pub logging_steps:    usize,
    pub text_column:      String,
    pub label_column:     String,
    pub label_names:      Option<Vec<String>>,
    pub output_file:      String,
    pub device:           DeviceChoice,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:        "stock_data.csv".to_string(),
            output_dir:       "roberta_financial_sentiment".to_string(),
            model_name:       "roberta-base".to_string(),
            max_length:       128,
            batch_size:       16,
            epochs:           3,
            lr:               2e-5,
            weight_decay:     0.01,
            warmup_steps:     0,
            test_size:        0.1,
            seed:             42,
            save_total_limit: 2,
            logging_steps:    50,
            text_column:      "text".to_string(),
            label_column:     "label".to_string(),
            label_names:      None,
            output_file:      "stock_data_with_sentiment.csv".to_string(),
            device:           DeviceChoice::Auto,
        }
    }
}

impl TrainConfig {
    pub fn output_csv(&self) -> PathBuf {
        Path::new(&self.output_dir).join(&self.output_file)
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub num_labels:      usize,
    pub train_rows:      usize,
    pub test_rows:       usize,
    pub best_checkpoint: Option<String>,
    pub held_out:        EvalReport,
    pub output_csv:      PathBuf,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline on the WGPU backend.
    pub fn execute(&self) -> Result<TrainSummary> {
        let device = self.config.device.wgpu_device();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<Autodiff<Wgpu>>(device)
    }

    /// Run the pipeline on any autodiff backend.
    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Load the table ────────────────────────────────────────────
        let table   = CorpusTable::read(&cfg.data_path)?;
        let records = table.records(&cfg.text_column, &cfg.label_column)?;

        // ── Step 2: Label space over the full table ───────────────────────────
        let labels = LabelSpace::from_labels(records.iter().map(|r| r.label));
        anyhow::ensure!(
            labels.len() >= 2,
            "need at least two distinct labels to train a classifier, found {:?}",
            labels.values()
        );
        let label_names = match &cfg.label_names {
            Some(names) => {
                anyhow::ensure!(
                    names.len() == labels.len(),
                    "--label_names has {} names but the table has {} labels {:?}",
                    names.len(),
                    labels.len(),
                    labels.values()
                );
                names.clone()
            }
            None => labels.default_names(),
        };
        tracing::info!("Label space: {:?} → {:?}", labels.values(), label_names);

        // ── Step 3: Stratified split ──────────────────────────────────────────
        let classes: Vec<usize> = records
            .iter()
            .map(|r| labels.class_of(r.label).unwrap_or_default())
            .collect();
        let (train, test) = stratified_split(records, &classes, cfg.test_size, cfg.seed)?;

        let train_labels: Vec<i64> = train.iter().map(|r| r.label).collect();
        let missing = labels.missing_from(&train_labels);
        if !missing.is_empty() {
            return Err(DataError::UncoveredLabels { missing }.into());
        }
        tracing::info!("Split: {} train, {} held out", train.len(), test.len());

        // ── Step 4: Pretrained model and tokenizer ────────────────────────────
        let files     = ModelFiles::resolve(&cfg.model_name)?;
        let base_cfg  = PretrainedConfig::load(&files.config)?;
        let tokenizer = TokenizerStore::load_file(&files.tokenizer)?;
        let pad_id    = resolve_pad_id(&tokenizer, base_cfg.pad_token_id);

        let max_length = if cfg.max_length > base_cfg.max_input_length() {
            tracing::warn!(
                "max_length {} exceeds what the model can address; using {}",
                cfg.max_length,
                base_cfg.max_input_length()
            );
            base_cfg.max_input_length()
        } else {
            cfg.max_length
        };
        let tokenizer = truncating_tokenizer(&tokenizer, max_length)?;

        // ── Step 5: Datasets ──────────────────────────────────────────────────
        let test_texts: Vec<String>  = test.iter().map(|r| r.text.clone()).collect();
        let test_labels: Vec<i64>    = test.iter().map(|r| r.label).collect();
        let train_ds = dataset(train, &labels, &tokenizer, max_length)?;
        let eval_ds  = dataset(test, &labels, &tokenizer, max_length)?;
        let (train_rows, test_rows) = (train_ds.sample_count(), eval_ds.sample_count());

        // ── Step 6: Save config ───────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.output_dir)?;
        checkpoints.save_config(cfg)?;

        // ── Step 7: Train ─────────────────────────────────────────────────────
        let model_cfg = SentimentModelConfig::from_pretrained(&base_cfg, labels.len());
        let model     = load_model::<B>(&files, &model_cfg, &device)?;
        let meta      = ModelMeta {
            config: base_cfg.with_labels(&label_names, labels.values()),
            tokenizer,
        };
        let outcome = run_training(cfg, model, train_ds, eval_ds, pad_id, &meta, &checkpoints, &device)?;

        // ── Step 8: Save the fine-tuned model ─────────────────────────────────
        let out_dir = Path::new(&cfg.output_dir);
        save_pretrained(out_dir, &outcome.model.valid(), &meta)?;
        checkpoints.save_state(None, &outcome.state)?;
        tracing::info!("Saved fine-tuned model to '{}'", out_dir.display());

        // ── Step 9: Held-out evaluation of the saved model ────────────────────
        let inferencer = Inferencer::<B::InnerBackend>::from_dir(out_dir, device, cfg.batch_size)
            .context("Cannot reload the saved model")?;
        let held_out = evaluate_classifier(
            &inferencer,
            inferencer.label_space(),
            &test_texts,
            &test_labels,
            cfg.batch_size,
        )?;
        write_eval_results(out_dir, &held_out, test_rows)?;
        tracing::info!(
            "Held-out: loss={:.4} accuracy={:.4} f1={:.4}",
            held_out.loss,
            held_out.metrics.accuracy,
            held_out.metrics.f1
        );

        // ── Step 10: Annotate the full table ──────────────────────────────────
        let labelled   = annotate_table(&inferencer, &table, &cfg.text_column, cfg.batch_size)?;
        let output_csv = cfg.output_csv();
        labelled.write(&output_csv)?;

        Ok(TrainSummary {
            num_labels: labels.len(),
            train_rows,
            test_rows,
            best_checkpoint: outcome.state.best_model_checkpoint,
            held_out,
            output_csv,
        })
    }
}

fn dataset(
    records:    Vec<Record>,
    labels:     &LabelSpace,
    tokenizer:  &tokenizers::Tokenizer,
    max_length: usize,
) -> Result<SentimentDataset> {
    let (texts, classes): (Vec<String>, Vec<usize>) = records
        .into_iter()
        .map(|r| {
            let class = labels.class_of(r.label).unwrap_or_default();
            (r.text, class)
        })
        .unzip();
    SentimentDataset::new(texts, classes, tokenizer, max_length)
}
