// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Classifies single texts typed on the command line with a
// fine-tuned model directory (the output directory or any
// checkpoint-N inside it).

use anyhow::{ensure, Result};
use burn::backend::Wgpu;
use std::path::Path;

use crate::domain::{prediction::Prediction, traits::SentimentClassifier};
use crate::infra::device::DeviceChoice;
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase<C: SentimentClassifier> {
    classifier: C,
}

impl PredictUseCase<Inferencer<Wgpu>> {
    pub fn load(model_dir: &Path, device: &DeviceChoice) -> Result<Self> {
        let device = device.wgpu_device();
        tracing::info!("Using WGPU device: {:?}", device);
        Ok(Self::new(Inferencer::from_dir(model_dir, device, 1)?))
    }
}

impl<C: SentimentClassifier> PredictUseCase<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let text = text.trim();
        ensure!(!text.is_empty(), "cannot classify an empty text");
        self.classifier.predict(text)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    struct Bullish {
        names: Vec<String>,
    }

    impl SentimentClassifier for Bullish {
        fn class_scores(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0, 1.0, 3.0]).collect())
        }

        fn label_names(&self) -> &[String] {
            &self.names
        }
    }

    fn use_case() -> PredictUseCase<Bullish> {
        let names = vec!["negative".into(), "neutral".into(), "positive".into()];
        PredictUseCase::new(Bullish { names })
    }

    #[test]
    fn test_predicts_highest_scoring_label() {
        let p = use_case().predict("  shares rise  ").unwrap();
        assert_eq!(p.label, "positive");
        assert_eq!(p.class_id, 2);
        assert!(p.score > 0.5 && p.score <= 1.0);
    }

    #[test]
    fn test_empty_text_is_rejected() {
        assert!(use_case().predict("   ").is_err());
    }
}
