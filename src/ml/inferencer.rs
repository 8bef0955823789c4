// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads a fine-tuned model directory and turns texts into
// predictions, `batch_size` texts per forward pass.
//
//   texts ─► tokenizer (truncating) ─► padded batch ─► model
//                                                       │
//   predictions ◄── argmax + softmax ◄── logits [n, classes]
//
// Row order is preserved: prediction i belongs to text i.
// `predict` and `predict_batch` come from SentimentClassifier.

use anyhow::{anyhow, bail, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::data::{
    batcher::{EncoderInput, SentimentBatcher},
    dataset::{encode_text, truncating_tokenizer},
};
use crate::domain::{record::LabelSpace, traits::SentimentClassifier};
use crate::infra::{
    model_store::{ModelFiles, PretrainedConfig, Weights},
    tokenizer_store::{resolve_pad_id, saved_max_length, TokenizerStore},
};
use crate::ml::{
    model::{SentimentModel, SentimentModelConfig},
    weights::load_model,
};

pub struct Inferencer<B: Backend> {
    model:       SentimentModel<B>,
    tokenizer:   Tokenizer,
    batcher:     SentimentBatcher<B>,
    label_names: Vec<String>,
    labels:      LabelSpace,
    batch_size:  usize,
}

impl<B: Backend> Inferencer<B> {
    /// Load a directory written by the training pipeline.
    pub fn from_dir(dir: &Path, device: B::Device, batch_size: usize) -> Result<Self> {
        let files = ModelFiles::from_dir(dir)?;
        if !matches!(files.weights, Weights::FineTuned(_)) {
            bail!("'{}' does not contain a fine-tuned model", dir.display());
        }

        let config      = PretrainedConfig::load(&files.config)?;
        let label_names = config.label_names();
        if label_names.is_empty() {
            bail!("'{}' has no id2label map; it was not fine-tuned for classification", dir.display());
        }

        let model_cfg = SentimentModelConfig::from_pretrained(&config, label_names.len());
        let model     = load_model::<B>(&files, &model_cfg, &device)?;

        let tokenizer  = TokenizerStore::load_file(&files.tokenizer)?;
        let max_length = saved_max_length(&tokenizer)
            .unwrap_or(config.max_input_length())
            .min(config.max_input_length());
        let pad_id     = resolve_pad_id(&tokenizer, config.pad_token_id);

        let labels = if config.label_values.len() == label_names.len() {
            LabelSpace::from_values(config.label_values.clone())
        } else {
            LabelSpace::from_values((0..label_names.len() as i64).collect())
        };

        tracing::info!(
            "Loaded classifier from '{}': {} labels, max_length={}",
            dir.display(),
            label_names.len(),
            max_length
        );

        Ok(Self {
            model,
            tokenizer: truncating_tokenizer(&tokenizer, max_length)?,
            batcher: SentimentBatcher::new(device, pad_id),
            label_names,
            labels,
            batch_size: batch_size.max(1),
        })
    }

    /// Raw label values of the classes, in class-id order.
    pub fn label_space(&self) -> &LabelSpace {
        &self.labels
    }

    /// Logits for every text, one row per text.
    pub fn logits(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut rows = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let ids = chunk
                .iter()
                .map(|t| encode_text(&self.tokenizer, t).map(|(ids, _)| ids))
                .collect::<Result<Vec<_>>>()?;

            let input: EncoderInput<B> =
                Batcher::<Vec<u32>, EncoderInput<B>>::batch(&self.batcher, ids);
            let logits = self.model.forward(input);
            let [_, classes] = logits.dims();

            let flat: Vec<f32> = logits
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;
            rows.extend(flat.chunks(classes).map(|r| r.to_vec()));
        }
        Ok(rows)
    }
}

impl<B: Backend> SentimentClassifier for Inferencer<B> {
    fn class_scores(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.logits(texts)
    }

    fn label_names(&self) -> &[String] {
        &self.label_names
    }
}
