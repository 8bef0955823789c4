// ============================================================
// Layer 5 — RoBERTa Sequence Classifier
// ============================================================
// A RoBERTa encoder with a sentence-classification head.
// Module and field names follow the published checkpoint layout
// (after key remapping in weights.rs), so pretrained encoder
// weights load into it unchanged.
//
//   input_ids ─► word emb ─┐
//   position_ids ► pos emb ─┼─► + ─► LayerNorm ─► dropout
//   (zeros) ──► type emb ───┘                        │
//                                                    ▼
//                       N × EncoderLayer (post-LN, GELU FFN)
//                                                    │
//                          hidden state of <s> (token 0)
//                                                    ▼
//                 dropout ─► dense ─► tanh ─► dropout ─► out_proj
//                                                    │
//                                     logits [batch, num_labels]
//
// Reference: Liu et al. (2019) RoBERTa
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, tanh},
};

use crate::data::batcher::{EncoderInput, SentimentBatch};
use crate::infra::model_store::PretrainedConfig;

// NOTE: #[derive(Config)] generates Clone and Serialize/Deserialize itself.
#[derive(Config, Debug)]
pub struct SentimentModelConfig {
    pub vocab_size:              usize,
    pub max_position_embeddings: usize,
    pub hidden_size:             usize,
    pub num_layers:              usize,
    pub num_heads:               usize,
    pub intermediate_size:       usize,
    pub num_labels:              usize,
    #[config(default = 1)]
    pub type_vocab_size: usize,
    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
    #[config(default = 0.1)]
    pub hidden_dropout: f64,
    #[config(default = 0.1)]
    pub attention_dropout: f64,
}

impl SentimentModelConfig {
    /// Encoder shape from a model's `config.json`, with a head of
    /// `num_labels` outputs.
    pub fn from_pretrained(cfg: &PretrainedConfig, num_labels: usize) -> Self {
        Self::new(
            cfg.vocab_size,
            cfg.max_position_embeddings,
            cfg.hidden_size,
            cfg.num_hidden_layers,
            cfg.num_attention_heads,
            cfg.intermediate_size,
            num_labels,
        )
        .with_type_vocab_size(cfg.type_vocab_size)
        .with_layer_norm_eps(cfg.layer_norm_eps)
        .with_hidden_dropout(cfg.hidden_dropout_prob)
        .with_attention_dropout(cfg.attention_probs_dropout_prob)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SentimentModel<B> {
        SentimentModel {
            encoder:    self.init_encoder(device),
            classifier: self.init_head(device),
        }
    }

    pub fn init_encoder<B: Backend>(&self, device: &B::Device) -> RobertaEncoder<B> {
        let embeddings = Embeddings {
            word_embeddings:       EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings:   EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device),
            layer_norm:            self.layer_norm(device),
            dropout:               DropoutConfig::new(self.hidden_dropout).init(),
        };
        let layers = (0..self.num_layers)
            .map(|_| self.init_layer(device))
            .collect();
        RobertaEncoder { embeddings, layers }
    }

    fn init_layer<B: Backend>(&self, device: &B::Device) -> EncoderLayer<B> {
        EncoderLayer {
            attention: MultiHeadAttentionConfig::new(self.hidden_size, self.num_heads)
                .with_dropout(self.attention_dropout)
                .init(device),
            attention_norm: self.layer_norm(device),
            intermediate:   LinearConfig::new(self.hidden_size, self.intermediate_size).init(device),
            output:         LinearConfig::new(self.intermediate_size, self.hidden_size).init(device),
            output_norm:    self.layer_norm(device),
            dropout:        DropoutConfig::new(self.hidden_dropout).init(),
        }
    }

    fn init_head<B: Backend>(&self, device: &B::Device) -> ClassificationHead<B> {
        ClassificationHead {
            dense:    LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            out_proj: LinearConfig::new(self.hidden_size, self.num_labels).init(device),
            dropout:  DropoutConfig::new(self.hidden_dropout).init(),
        }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }
}

// ─── Embeddings ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Embeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub layer_norm:            LayerNorm<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> Embeddings<B> {
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>, position_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let token_types = Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &input_ids.device());

        let x = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(position_ids)
            + self.token_type_embeddings.forward(token_types);
        self.dropout.forward(self.layer_norm.forward(x))
    }
}

// ─── EncoderLayer ─────────────────────────────────────────────────────────────
/// One post-LN transformer block.
#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    pub attention:      MultiHeadAttention<B>,
    pub attention_norm: LayerNorm<B>,
    pub intermediate:   Linear<B>,
    pub output:         Linear<B>,
    pub output_norm:    LayerNorm<B>,
    pub dropout:        Dropout,
}

impl<B: Backend> EncoderLayer<B> {
    /// `pad_mask` is true on padded positions; they are never attended to.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .attention
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.attention_norm.forward(x + self.dropout.forward(attn));

        let ffn = self.output.forward(gelu(self.intermediate.forward(x.clone())));
        self.output_norm.forward(x + self.dropout.forward(ffn))
    }
}

// ─── RobertaEncoder ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RobertaEncoder<B: Backend> {
    pub embeddings: Embeddings<B>,
    pub layers:     Vec<EncoderLayer<B>>,
}

impl<B: Backend> RobertaEncoder<B> {
    /// [batch, seq_len] → hidden states [batch, seq_len, hidden]
    pub fn forward(&self, input: EncoderInput<B>) -> Tensor<B, 3> {
        let pad_mask = input.attention_mask.equal_elem(0);
        let mut x = self.embeddings.forward(input.input_ids, input.position_ids);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        x
    }
}

// ─── ClassificationHead ───────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ClassificationHead<B: Backend> {
    pub dense:    Linear<B>,
    pub out_proj: Linear<B>,
    pub dropout:  Dropout,
}

impl<B: Backend> ClassificationHead<B> {
    pub fn forward(&self, hidden: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, _, hidden_size] = hidden.dims();
        let first = hidden
            .slice([0..batch_size, 0..1, 0..hidden_size])
            .reshape([batch_size, hidden_size]);

        let x = tanh(self.dense.forward(self.dropout.forward(first)));
        self.out_proj.forward(self.dropout.forward(x))
    }
}

// ─── SentimentModel ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct SentimentModel<B: Backend> {
    pub encoder:    RobertaEncoder<B>,
    pub classifier: ClassificationHead<B>,
}

impl<B: Backend> SentimentModel<B> {
    /// Class logits, shape [batch, num_labels]
    pub fn forward(&self, input: EncoderInput<B>) -> Tensor<B, 2> {
        self.classifier.forward(self.encoder.forward(input))
    }

    /// Mean cross-entropy over the batch, plus the logits.
    pub fn forward_classification(&self, batch: SentimentBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(batch.input);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.labels);
        (loss, logits)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::SentimentBatcher;
    use crate::data::dataset::TokenizedExample;
    use burn::{backend::NdArray, data::dataloader::batcher::Batcher};

    type B = NdArray;

    fn tiny_config() -> SentimentModelConfig {
        SentimentModelConfig::new(16, 32, 8, 1, 2, 16, 3)
    }

    fn example(ids: &[u32], label: usize) -> TokenizedExample {
        TokenizedExample { input_ids: ids.to_vec(), attention_mask: vec![1; ids.len()], label }
    }

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let model  = tiny_config().init::<B>(&device);
        let batch: SentimentBatch<B> = SentimentBatcher::new(device, 1)
            .batch(vec![example(&[0, 5, 6, 2], 0), example(&[0, 7, 2], 2)]);

        let (loss, logits) = model.forward_classification(batch);
        assert_eq!(logits.dims(), [2, 3]);
        let loss: f64 = loss.into_scalar().elem();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_padding_does_not_change_logits() {
        let device  = Default::default();
        let model   = tiny_config().init::<B>(&device);
        let batcher = SentimentBatcher::<B>::new(device, 1);

        let alone: EncoderInput<B> = batcher.batch(vec![vec![0, 9, 2]]);
        let padded: EncoderInput<B> = batcher.batch(vec![vec![0, 9, 2], vec![0, 4, 5, 6, 7, 2]]);

        let a = model.forward(alone).into_data().to_vec::<f32>().unwrap();
        let b = model.forward(padded).into_data().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b[..3]) {
            assert!((x - y).abs() < 1e-4, "{x} vs {y}");
        }
    }

    #[test]
    fn test_from_pretrained_copies_shape() {
        let json = r#"{"vocab_size": 50, "hidden_size": 16, "num_hidden_layers": 2,
            "num_attention_heads": 4, "intermediate_size": 32,
            "max_position_embeddings": 40, "layer_norm_eps": 1e-12}"#;
        let cfg: PretrainedConfig = serde_json::from_str(json).unwrap();
        let m = SentimentModelConfig::from_pretrained(&cfg, 3);
        assert_eq!(m.num_layers, 2);
        assert_eq!(m.num_heads, 4);
        assert_eq!(m.num_labels, 3);
        assert_eq!(m.layer_norm_eps, 1e-12);
        assert_eq!(m.type_vocab_size, 1);
    }
}
