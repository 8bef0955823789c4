// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer labels tables and scores held-out data
// through this trait only. The Burn-backed Inferencer in Layer 5
// implements it; tests implement it with a fixed lookup so the
// annotation and evaluation workflows run without a model.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::{anyhow, Result};

use crate::domain::prediction::Prediction;

// ─── SentimentClassifier ──────────────────────────────────────────────────────
/// Anything that maps texts to per-class scores.
pub trait SentimentClassifier {
    /// Raw logits, one row per input text, in input order.
    fn class_scores(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Label strings in class-id order.
    fn label_names(&self) -> &[String];

    /// Classify many texts; one prediction per text, in input order.
    fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        let scores = self.class_scores(texts)?;
        if scores.len() != texts.len() {
            return Err(anyhow!(
                "classifier returned {} score rows for {} texts",
                scores.len(),
                texts.len()
            ));
        }
        scores
            .iter()
            .map(|row| {
                Prediction::from_logits(row, self.label_names()).ok_or_else(|| {
                    anyhow!("score row of width {} has no matching label", row.len())
                })
            })
            .collect()
    }

    /// Classify a single text.
    fn predict(&self, text: &str) -> Result<Prediction> {
        self.predict_batch(&[text])?
            .pop()
            .ok_or_else(|| anyhow!("classifier produced no prediction"))
    }
}
