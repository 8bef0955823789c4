// ============================================================
// Layer 4 — Sentiment Dataset Adapter
// ============================================================
// Wraps parallel arrays of texts and class ids. Nothing is
// tokenised up front: every access runs the tokenizer on one
// text, so the only thing held in memory is the raw corpus.
//
//   get(i) → <s> tok tok tok ... </s>   (≤ max_length ids)
//            1   1   1   1  ...  1      (attention mask)
//            label[i]
//
// Truncation is configured on the tokenizer itself so that the
// closing </s> survives when a long text is cut.

use anyhow::{anyhow, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};

/// One tokenised text with its class id. Not padded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedExample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          usize,
}

/// Return a copy of `tokenizer` that truncates to `max_length`
/// (special tokens included) and never pads on its own.
pub fn truncating_tokenizer(tokenizer: &Tokenizer, max_length: usize) -> Result<Tokenizer> {
    let mut tok = tokenizer.clone();
    tok.with_padding(None);
    tok.with_truncation(Some(TruncationParams {
        max_length,
        ..Default::default()
    }))
    .map_err(|e| anyhow!("Cannot configure truncation to {max_length}: {e}"))?;
    Ok(tok)
}

/// Tokenise one text with special tokens; returns (ids, mask).
pub fn encode_text(tokenizer: &Tokenizer, text: &str) -> Result<(Vec<u32>, Vec<u32>)> {
    let enc = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
    Ok((enc.get_ids().to_vec(), enc.get_attention_mask().to_vec()))
}

pub struct SentimentDataset {
    texts:     Vec<String>,
    labels:    Vec<usize>,
    tokenizer: Arc<Tokenizer>,
}

impl SentimentDataset {
    /// `labels[i]` is the class id of `texts[i]`.
    pub fn new(
        texts:      Vec<String>,
        labels:     Vec<usize>,
        tokenizer:  &Tokenizer,
        max_length: usize,
    ) -> Result<Self> {
        anyhow::ensure!(
            texts.len() == labels.len(),
            "{} texts but {} labels",
            texts.len(),
            labels.len()
        );
        let tokenizer = Arc::new(truncating_tokenizer(tokenizer, max_length)?);
        Ok(Self { texts, labels, tokenizer })
    }

    pub fn sample_count(&self) -> usize {
        self.texts.len()
    }

    /// Tokenise the text at `index`.
    /// Errors if the index is out of bounds or the tokenizer fails.
    pub fn try_get(&self, index: usize) -> Result<TokenizedExample> {
        let text = self.texts.get(index).ok_or_else(|| {
            anyhow!("index {index} out of bounds for dataset of {}", self.texts.len())
        })?;
        let (input_ids, attention_mask) = encode_text(&self.tokenizer, text)?;
        Ok(TokenizedExample {
            input_ids,
            attention_mask,
            label: self.labels[index],
        })
    }
}

// Burn's DataLoader stops an epoch at the first `None`, so a failed
// access shows up as a short epoch. The trainer counts the examples
// it receives and treats a short epoch as fatal.
impl Dataset<TokenizedExample> for SentimentDataset {
    fn get(&self, index: usize) -> Option<TokenizedExample> {
        if index >= self.texts.len() {
            return None;
        }
        match self.try_get(index) {
            Ok(example) => Some(example),
            Err(e) => {
                tracing::error!("Cannot build example {index}: {e:#}");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.texts.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tiny_tokenizer;

    fn dataset(max_length: usize) -> SentimentDataset {
        let texts = vec![
            "stocks rise".to_string(),
            "profit warning hits shares hard as guidance is cut again".to_string(),
        ];
        SentimentDataset::new(texts, vec![2, 0], &tiny_tokenizer(), max_length).unwrap()
    }

    #[test]
    fn test_len_counts_records() {
        let ds = dataset(32);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.sample_count(), 2);
    }

    #[test]
    fn test_example_has_special_tokens_and_label() {
        let ex = dataset(32).try_get(0).unwrap();
        // <s> stocks rise </s>
        assert_eq!(ex.input_ids.len(), 4);
        assert_eq!(ex.input_ids[0], 0);
        assert_eq!(*ex.input_ids.last().unwrap(), 2);
        assert_eq!(ex.attention_mask, vec![1; 4]);
        assert_eq!(ex.label, 2);
    }

    #[test]
    fn test_long_text_is_truncated_to_max_length() {
        let ex = dataset(6).try_get(1).unwrap();
        assert_eq!(ex.input_ids.len(), 6);
        assert_eq!(ex.attention_mask.len(), 6);
        // closing token is kept after truncation
        assert_eq!(*ex.input_ids.last().unwrap(), 2);
    }

    #[test]
    fn test_out_of_bounds_is_an_error() {
        let ds = dataset(32);
        assert!(ds.try_get(2).is_err());
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_mismatched_lengths_are_rejected() {
        let res = SentimentDataset::new(vec!["a".into()], vec![0, 1], &tiny_tokenizer(), 8);
        assert!(res.is_err());
    }
}
