// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the pretrained tokenizer that ships with a model
// directory and saves it next to the fine-tuned weights, so
// inference always uses exactly the vocabulary (and truncation
// length) the model was trained with.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load `tokenizer.json` from the store directory
    pub fn load(&self) -> Result<Tokenizer> {
        Self::load_file(&self.path())
    }

    pub fn load_file(path: &Path) -> Result<Tokenizer> {
        Tokenizer::from_file(path).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
        })
    }

    /// Write `tokenizer.json`, including its truncation settings.
    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot save tokenizer to '{}': {}", path.display(), e))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }
}

/// The padding id to use for batches. The model config is the
/// source of truth (its position embeddings depend on it); the
/// tokenizer's own `<pad>` token is only checked against it.
pub fn resolve_pad_id(tokenizer: &Tokenizer, config_pad_id: usize) -> u32 {
    let pad_id = config_pad_id as u32;
    match tokenizer.token_to_id("<pad>") {
        Some(tok_pad) if tok_pad != pad_id => {
            tracing::warn!(
                "Tokenizer <pad> id {} differs from model pad_token_id {}; using the model's",
                tok_pad,
                pad_id
            );
        }
        _ => {}
    }
    pad_id
}

/// Truncation length stored in a saved tokenizer, if any.
pub fn saved_max_length(tokenizer: &Tokenizer) -> Option<usize> {
    tokenizer.get_truncation().map(|t| t.max_length)
}
