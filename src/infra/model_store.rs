// ============================================================
// Layer 6 — Model Store
// ============================================================
// Finds the files that make up a model and writes the final
// fine-tuned model in the same layout, so the output directory
// can itself be passed back in as a model.
//
// A model directory (the output directory and every
// checkpoint-N inside it) holds:
//   config.json          — encoder hyperparameters (+ label maps
//                          once fine-tuned)
//   tokenizer.json       — Hugging Face tokenizer
//   model.mpk.gz         — fine-tuned weights (Burn record), or
//   pytorch_model.bin    — pretrained encoder weights
//
// `--model_name` may be a local directory or a Hugging Face Hub
// repo id such as `roberta-base`; hub files are fetched through
// hf-hub's cache.

use anyhow::{Context, Result};
use burn::prelude::*;
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::infra::checkpoint::{save_weights, WEIGHTS_FILE, WEIGHTS_STEM};
use crate::infra::tokenizer_store::{TokenizerStore, TOKENIZER_FILE};
use crate::ml::model::SentimentModel;

pub const CONFIG_FILE: &str = "config.json";
pub const PRETRAINED_WEIGHTS_FILE: &str = "pytorch_model.bin";

fn default_type_vocab_size() -> usize { 1 }
fn default_layer_norm_eps() -> f64 { 1e-5 }
fn default_dropout() -> f64 { 0.1 }
fn default_pad_token_id() -> usize { 1 }

// ─── PretrainedConfig ─────────────────────────────────────────────────────────
/// The subset of a Hugging Face `config.json` the encoder needs.
/// Unknown keys are carried through untouched so a saved config
/// still describes the original model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PretrainedConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,

    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,

    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,

    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob: f64,

    #[serde(default = "default_dropout")]
    pub attention_probs_dropout_prob: f64,

    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: usize,

    /// Class id (as a string key) → label name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub id2label: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label2id: BTreeMap<String, usize>,

    /// Raw label value of each class id, as seen in the training table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_values: Vec<i64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PretrainedConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write model config '{}'", path.display()))
    }

    /// Attach the label maps of a fine-tuned classifier.
    pub fn with_labels(mut self, names: &[String], values: &[i64]) -> Self {
        self.id2label = names
            .iter()
            .enumerate()
            .map(|(i, n)| (i.to_string(), n.clone()))
            .collect();
        self.label2id = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        self.label_values = values.to_vec();
        self.extra
            .insert("num_labels".to_string(), serde_json::json!(names.len()));
        self
    }

    /// Label names in class-id order. Empty for a model that has
    /// not been fine-tuned yet.
    pub fn label_names(&self) -> Vec<String> {
        let mut pairs: Vec<(usize, &String)> = self
            .id2label
            .iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
            .collect();
        pairs.sort_by_key(|(i, _)| *i);
        pairs.into_iter().map(|(_, v)| v.clone()).collect()
    }

    /// Longest input (special tokens included) the position
    /// embeddings can address.
    pub fn max_input_length(&self) -> usize {
        self.max_position_embeddings
            .saturating_sub(self.pad_token_id + 1)
    }
}

// ─── ModelFiles ───────────────────────────────────────────────────────────────
/// Which weights a model directory provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Weights {
    /// Full classifier saved by this tool
    FineTuned(PathBuf),
    /// Encoder-only PyTorch checkpoint; the head starts fresh
    Pretrained(PathBuf),
    /// No weights at all; everything starts fresh
    Missing,
}

#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config:    PathBuf,
    pub tokenizer: PathBuf,
    pub weights:   Weights,
}

impl ModelFiles {
    /// A local directory if one exists at `model_name`, otherwise a
    /// Hugging Face Hub repo id.
    pub fn resolve(model_name: &str) -> Result<Self> {
        let local = Path::new(model_name);
        if local.is_dir() {
            tracing::info!("Using local model directory '{}'", local.display());
            Self::from_dir(local)
        } else {
            tracing::info!("Fetching '{}' from the Hugging Face Hub", model_name);
            Self::from_hub(model_name)
        }
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let config    = dir.join(CONFIG_FILE);
        let tokenizer = dir.join(TOKENIZER_FILE);
        anyhow::ensure!(config.is_file(), "'{}' has no {}", dir.display(), CONFIG_FILE);
        anyhow::ensure!(tokenizer.is_file(), "'{}' has no {}", dir.display(), TOKENIZER_FILE);

        let fine_tuned = dir.join(WEIGHTS_FILE);
        let pretrained = dir.join(PRETRAINED_WEIGHTS_FILE);
        let weights = if fine_tuned.is_file() {
            Weights::FineTuned(dir.join(WEIGHTS_STEM))
        } else if pretrained.is_file() {
            Weights::Pretrained(pretrained)
        } else {
            Weights::Missing
        };

        Ok(Self { config, tokenizer, weights })
    }

    fn from_hub(repo_id: &str) -> Result<Self> {
        let api  = Api::new().context("Cannot initialise the Hugging Face Hub client")?;
        let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));

        let config = repo
            .get(CONFIG_FILE)
            .with_context(|| format!("Cannot fetch {CONFIG_FILE} for '{repo_id}'"))?;
        let tokenizer = repo
            .get(TOKENIZER_FILE)
            .with_context(|| format!("Cannot fetch {TOKENIZER_FILE} for '{repo_id}'"))?;
        let weights = repo
            .get(PRETRAINED_WEIGHTS_FILE)
            .with_context(|| format!("Cannot fetch {PRETRAINED_WEIGHTS_FILE} for '{repo_id}'"))?;

        Ok(Self { config, tokenizer, weights: Weights::Pretrained(weights) })
    }
}

// ─── ModelMeta ────────────────────────────────────────────────────────────────
/// What a model directory holds besides the weights: the config
/// with label maps and the truncating tokenizer.
#[derive(Clone)]
pub struct ModelMeta {
    pub config:    PretrainedConfig,
    pub tokenizer: Tokenizer,
}

/// Write a fine-tuned model directory: weights, config and tokenizer.
pub fn save_pretrained<B: Backend>(
    dir:   &Path,
    model: &SentimentModel<B>,
    meta:  &ModelMeta,
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;
    save_weights(model, &dir.join(WEIGHTS_STEM))?;
    meta.config.save(&dir.join(CONFIG_FILE))?;
    TokenizerStore::new(dir).save(&meta.tokenizer)?;
    tracing::debug!("Wrote model files to '{}'", dir.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const ROBERTA_BASE: &str = r#"{
        "architectures": ["RobertaForMaskedLM"],
        "attention_probs_dropout_prob": 0.1,
        "bos_token_id": 0,
        "eos_token_id": 2,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "hidden_size": 768,
        "initializer_range": 0.02,
        "intermediate_size": 3072,
        "layer_norm_eps": 1e-05,
        "max_position_embeddings": 514,
        "model_type": "roberta",
        "num_attention_heads": 12,
        "num_hidden_layers": 12,
        "pad_token_id": 1,
        "type_vocab_size": 1,
        "vocab_size": 50265
    }"#;

    #[test]
    fn test_parses_roberta_base_config() {
        let cfg: PretrainedConfig = serde_json::from_str(ROBERTA_BASE).unwrap();
        assert_eq!(cfg.hidden_size, 768);
        assert_eq!(cfg.pad_token_id, 1);
        assert_eq!(cfg.max_input_length(), 512);
        assert!(cfg.label_names().is_empty());
        assert_eq!(cfg.extra["model_type"], "roberta");
    }

    #[test]
    fn test_label_maps_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let names: Vec<String> = (0..3).map(|i| format!("LABEL_{i}")).collect();

        let cfg: PretrainedConfig = serde_json::from_str(ROBERTA_BASE).unwrap();
        cfg.with_labels(&names, &[0, 1, 2]).save(&path).unwrap();

        let loaded = PretrainedConfig::load(&path).unwrap();
        assert_eq!(loaded.label_names(), names);
        assert_eq!(loaded.label2id["LABEL_2"], 2);
        assert_eq!(loaded.label_values, vec![0, 1, 2]);
        assert_eq!(loaded.extra["model_type"], "roberta");
    }

    #[test]
    fn test_from_dir_detects_weights() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), ROBERTA_BASE).unwrap();
        fs::write(dir.path().join(TOKENIZER_FILE), "{}").unwrap();
        assert_eq!(ModelFiles::from_dir(dir.path()).unwrap().weights, Weights::Missing);

        fs::write(dir.path().join(PRETRAINED_WEIGHTS_FILE), b"").unwrap();
        assert!(matches!(
            ModelFiles::from_dir(dir.path()).unwrap().weights,
            Weights::Pretrained(_)
        ));

        fs::write(dir.path().join(WEIGHTS_FILE), b"").unwrap();
        assert!(matches!(
            ModelFiles::from_dir(dir.path()).unwrap().weights,
            Weights::FineTuned(_)
        ));
    }

    #[test]
    fn test_from_dir_requires_config_and_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ModelFiles::from_dir(dir.path()).is_err());
    }
}
