// ============================================================
// Layer 5 — Weight Loading
// ============================================================
// Builds a SentimentModel and fills it from whatever weights the
// model directory provides:
//
//   model.mpk.gz       → the full classifier (a run of this tool)
//   pytorch_model.bin  → encoder only; the head starts fresh
//   nothing            → random initialisation, with a warning
//
// PyTorch checkpoints use the Hugging Face key names. They are
// remapped onto this crate's module paths before loading:
//
//   roberta.encoder.layer.3.attention.self.query.weight
//       → layers.3.attention.query.weight
//
// Linear weights are transposed and LayerNorm weight/bias become
// gamma/beta by burn-import's PyTorch adapter.
//
// Reference: Burn Book §6 (Importing PyTorch Models)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use std::path::Path;

use crate::infra::checkpoint::load_weights;
use crate::infra::model_store::{ModelFiles, Weights};
use crate::ml::model::{RobertaEncoderRecord, SentimentModel, SentimentModelConfig};

/// Hugging Face key → module path, applied in order.
const KEY_REMAP: &[(&str, &str)] = &[
    (r"^roberta\.", ""),
    (r"^embeddings\.LayerNorm", "embeddings.layer_norm"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.self\.(query|key|value)", "layers.$1.attention.$2"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.dense", "layers.$1.attention.output"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm", "layers.$1.attention_norm"),
    (r"^encoder\.layer\.([0-9]+)\.intermediate\.dense", "layers.$1.intermediate"),
    (r"^encoder\.layer\.([0-9]+)\.output\.dense", "layers.$1.output"),
    (r"^encoder\.layer\.([0-9]+)\.output\.LayerNorm", "layers.$1.output_norm"),
];

pub fn load_model<B: Backend>(
    files:  &ModelFiles,
    config: &SentimentModelConfig,
    device: &B::Device,
) -> Result<SentimentModel<B>> {
    let model = config.init::<B>(device);
    match &files.weights {
        Weights::FineTuned(stem) => load_weights(model, stem, device),
        Weights::Pretrained(path) => {
            let record = load_pretrained_encoder::<B>(path, device)?;
            tracing::info!(
                "Loaded pretrained encoder from '{}'; classification head is newly initialised",
                path.display()
            );
            Ok(SentimentModel {
                encoder:    model.encoder.load_record(record),
                classifier: model.classifier,
            })
        }
        Weights::Missing => {
            tracing::warn!("No weights found for the model; training starts from random initialisation");
            Ok(model)
        }
    }
}

fn load_pretrained_encoder<B: Backend>(
    path:   &Path,
    device: &B::Device,
) -> Result<RobertaEncoderRecord<B>> {
    let args = KEY_REMAP
        .iter()
        .fold(LoadArgs::new(path.to_path_buf()), |args, (from, to)| {
            args.with_key_remap(from, to)
        });

    PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(args, device)
        .with_context(|| format!("Cannot import PyTorch weights '{}'", path.display()))
}
