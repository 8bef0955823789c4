// ============================================================
// Layer 4 — Padding Batcher (collator)
// ============================================================
// Implements Burn's Batcher trait to turn a Vec of unpadded
// TokenizedExamples into rectangular tensors.
//
// Padding is per batch, not global: every row is padded to the
// longest sequence in *this* batch.
//
//   ex 1:  <s> a b c </s>         ids   0 5 6 7 2
//   ex 2:  <s> d </s>        →    ids   0 8 2 1 1      (pad id = 1)
//                                 mask  1 1 1 0 0
//                                 pos   2 3 4 1 1
//
// Position ids follow the RoBERTa convention: real tokens count
// up from pad_id + 1, padded slots get pad_id itself (the
// position embedding reserved for padding).
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TokenizedExample;

// ─── CollatedBatch ────────────────────────────────────────────────────────────
/// A padded batch as flat row-major vectors, before it is moved
/// onto a device. Kept separate from the tensor batch so padding
/// can be checked without a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CollatedBatch {
    pub batch_size:     usize,
    pub seq_len:        usize,
    pub input_ids:      Vec<i32>,
    pub attention_mask: Vec<i32>,
    pub position_ids:   Vec<i32>,
    pub labels:         Vec<i32>,
}

impl CollatedBatch {
    /// Row `i` of the padded token ids.
    #[cfg(test)]
    pub fn ids_row(&self, i: usize) -> &[i32] {
        &self.input_ids[i * self.seq_len..(i + 1) * self.seq_len]
    }

    /// Row `i` of the attention mask.
    #[cfg(test)]
    pub fn mask_row(&self, i: usize) -> &[i32] {
        &self.attention_mask[i * self.seq_len..(i + 1) * self.seq_len]
    }
}

// ─── Tensor batches ───────────────────────────────────────────────────────────
/// Encoder inputs, each of shape [batch_size, seq_len].
#[derive(Debug, Clone)]
pub struct EncoderInput<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,
    pub position_ids:   Tensor<B, 2, Int>,
}

/// Encoder inputs plus gold class ids of shape [batch_size].
#[derive(Debug, Clone)]
pub struct SentimentBatch<B: Backend> {
    pub input:  EncoderInput<B>,
    pub labels: Tensor<B, 1, Int>,
}

// ─── SentimentBatcher ─────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SentimentBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
}

impl<B: Backend> SentimentBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }

    /// Pad labelled examples to the batch maximum length.
    pub fn collate(&self, items: &[TokenizedExample]) -> CollatedBatch {
        let mut batch = self.pad(items.iter().map(|e| e.input_ids.as_slice()));
        batch.labels = items.iter().map(|e| e.label as i32).collect();
        batch
    }

    /// Pad unlabelled token sequences (inference).
    pub fn collate_ids(&self, sequences: &[Vec<u32>]) -> CollatedBatch {
        self.pad(sequences.iter().map(|s| s.as_slice()))
    }

    fn pad<'a>(&self, sequences: impl Iterator<Item = &'a [u32]> + Clone) -> CollatedBatch {
        let batch_size = sequences.clone().count();
        let seq_len    = sequences.clone().map(|s| s.len()).max().unwrap_or(0);
        let pad        = self.pad_id as i32;

        let mut input_ids      = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        let mut position_ids   = Vec::with_capacity(batch_size * seq_len);

        for seq in sequences {
            for pos in 0..seq_len {
                match seq.get(pos) {
                    Some(&id) => {
                        input_ids.push(id as i32);
                        attention_mask.push(1);
                        position_ids.push(pad + 1 + pos as i32);
                    }
                    None => {
                        input_ids.push(pad);
                        attention_mask.push(0);
                        position_ids.push(pad);
                    }
                }
            }
        }

        CollatedBatch {
            batch_size,
            seq_len,
            input_ids,
            attention_mask,
            position_ids,
            labels: Vec::new(),
        }
    }

    /// Move a collated batch onto the device.
    pub fn to_input(&self, batch: &CollatedBatch) -> EncoderInput<B> {
        let shape = [batch.batch_size, batch.seq_len];
        let tensor = |values: &[i32]| {
            Tensor::<B, 1, Int>::from_ints(values, &self.device).reshape(shape)
        };
        EncoderInput {
            input_ids:      tensor(&batch.input_ids),
            attention_mask: tensor(&batch.attention_mask),
            position_ids:   tensor(&batch.position_ids),
        }
    }
}

// Training / evaluation batches
impl<B: Backend> Batcher<TokenizedExample, SentimentBatch<B>> for SentimentBatcher<B> {
    fn batch(&self, items: Vec<TokenizedExample>) -> SentimentBatch<B> {
        let collated = self.collate(&items);
        let labels   = Tensor::<B, 1, Int>::from_ints(collated.labels.as_slice(), &self.device);
        SentimentBatch {
            input: self.to_input(&collated),
            labels,
        }
    }
}

// Inference batches: raw token id sequences, no labels
impl<B: Backend> Batcher<Vec<u32>, EncoderInput<B>> for SentimentBatcher<B> {
    fn batch(&self, items: Vec<Vec<u32>>) -> EncoderInput<B> {
        self.to_input(&self.collate_ids(&items))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn example(ids: &[u32], label: usize) -> TokenizedExample {
        TokenizedExample {
            input_ids:      ids.to_vec(),
            attention_mask: vec![1; ids.len()],
            label,
        }
    }

    fn batcher() -> SentimentBatcher<NdArray> {
        SentimentBatcher::new(Default::default(), 1)
    }

    #[test]
    fn test_pads_to_batch_maximum() {
        let items = vec![example(&[0, 5, 6, 7, 2], 2), example(&[0, 8, 2], 0)];
        let b = batcher().collate(&items);

        assert_eq!(b.seq_len, 5);
        assert_eq!(b.ids_row(0), &[0, 5, 6, 7, 2]);
        assert_eq!(b.ids_row(1), &[0, 8, 2, 1, 1]);
        assert_eq!(b.labels, vec![2, 0]);
    }

    #[test]
    fn test_padded_positions_are_masked_out() {
        let items = vec![example(&[0, 9, 2], 1), example(&[0, 2], 1)];
        let b = batcher().collate(&items);

        for row in 0..b.batch_size {
            for (id, mask) in b.ids_row(row).iter().zip(b.mask_row(row)) {
                if *mask == 0 {
                    assert_eq!(*id, 1, "padded slot must hold the pad id");
                }
            }
        }
        assert_eq!(b.mask_row(1), &[1, 1, 0]);
    }

    #[test]
    fn test_position_ids_start_after_pad_id() {
        let b = batcher().collate(&[example(&[0, 9, 2], 0), example(&[0, 2], 0)]);
        assert_eq!(&b.position_ids[..3], &[2, 3, 4]);
        assert_eq!(&b.position_ids[3..], &[2, 3, 1]);
    }

    #[test]
    fn test_batch_length_is_not_global() {
        let short = batcher().collate(&[example(&[0, 2], 0), example(&[0, 4, 2], 1)]);
        assert_eq!(short.seq_len, 3);
    }

    #[test]
    fn test_tensor_shapes() {
        let items = vec![example(&[0, 5, 2], 0), example(&[0, 2], 1), example(&[0, 1, 1, 2], 2)];
        let batch: SentimentBatch<NdArray> = batcher().batch(items);
        assert_eq!(batch.input.input_ids.dims(), [3, 4]);
        assert_eq!(batch.input.attention_mask.dims(), [3, 4]);
        assert_eq!(batch.labels.dims(), [3]);
    }
}
