// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a fine-tuned model on a labelled table and writes
// eval_results.json into the model directory.
//
// Raw labels in the table are mapped through the label space the
// model was trained with; a label the model has never seen is an
// error rather than a silent miss.

use anyhow::{Context, Result};
use burn::backend::Wgpu;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::{error::DataError, table::CorpusTable};
use crate::domain::{record::LabelSpace, traits::SentimentClassifier};
use crate::infra::device::DeviceChoice;
use crate::ml::{evaluation::EvalReport, inferencer::Inferencer};

pub const EVAL_RESULTS_FILE: &str = "eval_results.json";

/// Score `classifier` on (text, raw label) pairs.
pub fn evaluate_classifier<C: SentimentClassifier + ?Sized>(
    classifier: &C,
    labels:     &LabelSpace,
    texts:      &[String],
    raw_labels: &[i64],
    batch_size: usize,
) -> Result<EvalReport> {
    let gold = raw_labels
        .iter()
        .map(|&l| {
            labels.class_of(l).ok_or_else(|| DataError::UnknownLabel {
                label: l,
                known: labels.values().to_vec(),
            })
        })
        .collect::<std::result::Result<Vec<usize>, _>>()?;

    let mut logits = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
        logits.extend(classifier.class_scores(&refs)?);
    }
    anyhow::ensure!(
        logits.len() == gold.len(),
        "classifier returned {} score rows for {} texts",
        logits.len(),
        gold.len()
    );

    Ok(EvalReport::from_logits(&logits, &gold))
}

/// Write `eval_results.json` into `dir`.
pub fn write_eval_results(dir: &Path, report: &EvalReport, samples: usize) -> Result<PathBuf> {
    let path = dir.join(EVAL_RESULTS_FILE);
    let json = serde_json::to_string_pretty(&report.to_results(samples))?;
    fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    Ok(path)
}

// ─── EvaluateUseCase ──────────────────────────────────────────────────────────
pub struct EvaluateUseCase {
    pub model_dir:    PathBuf,
    pub data_path:    PathBuf,
    pub text_column:  String,
    pub label_column: String,
    pub batch_size:   usize,
    pub device:       DeviceChoice,
}

impl EvaluateUseCase {
    pub fn execute(&self) -> Result<EvalReport> {
        let device = self.device.wgpu_device();
        tracing::info!("Using WGPU device: {:?}", device);

        let table      = CorpusTable::read(&self.data_path)?;
        let texts      = table.texts(&self.text_column)?;
        let raw_labels = table.labels(&self.label_column)?;

        let inferencer = Inferencer::<Wgpu>::from_dir(&self.model_dir, device, self.batch_size)?;
        let report = evaluate_classifier(
            &inferencer,
            inferencer.label_space(),
            &texts,
            &raw_labels,
            self.batch_size,
        )?;

        let path = write_eval_results(&self.model_dir, &report, texts.len())?;
        tracing::info!("Wrote evaluation results to '{}'", path.display());
        Ok(report)
    }
}
