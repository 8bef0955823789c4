// Fixtures shared by unit tests: a word-level tokenizer with the
// RoBERTa special tokens and a tiny model directory built on it.

use std::{fs, path::Path};
use tokenizers::Tokenizer;

use crate::data::dataset::truncating_tokenizer;
use crate::infra::model_store::{ModelMeta, PretrainedConfig, CONFIG_FILE};
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::SentimentModelConfig;

pub const WORDS: &[&str] = &[
    "stocks", "rise", "fall", "market", "profit", "loss", "shares", "gain",
    "drop", "steady", "flat", "the", "earnings", "beat", "miss", "guidance",
];

pub const TINY_VOCAB: usize = 4 + 16;

/// `<s>`=0, `<pad>`=1, `</s>`=2, `<unk>`=3, then WORDS.
pub fn tiny_tokenizer() -> Tokenizer {
    let mut vocab = serde_json::Map::new();
    for (i, tok) in ["<s>", "<pad>", "</s>", "<unk>"].iter().chain(WORDS).enumerate() {
        vocab.insert(tok.to_string(), serde_json::json!(i));
    }
    let special = |id: usize, content: &str| {
        serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        })
    };

    let json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [special(0, "<s>"), special(1, "<pad>"), special(2, "</s>"), special(3, "<unk>")],
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "RobertaProcessing",
            "sep": ["</s>", 2],
            "cls": ["<s>", 0],
            "trim_offsets": true,
            "add_prefix_space": false
        },
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "<unk>" }
    });
    json.to_string().parse::<Tokenizer>().expect("tiny tokenizer JSON is valid")
}

pub fn tiny_pretrained_config() -> PretrainedConfig {
    serde_json::from_value(serde_json::json!({
        "model_type": "roberta",
        "vocab_size": TINY_VOCAB,
        "hidden_size": 16,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": 32,
        "max_position_embeddings": 64,
        "pad_token_id": 1
    }))
    .expect("tiny config is valid")
}

pub fn tiny_model_config(num_labels: usize) -> SentimentModelConfig {
    SentimentModelConfig::from_pretrained(&tiny_pretrained_config(), num_labels)
}

/// Model files for a `num_labels`-way classifier named `LABEL_i`,
/// with a tokenizer truncating to 16 tokens.
pub fn tiny_meta(num_labels: usize) -> ModelMeta {
    let names: Vec<String>  = (0..num_labels).map(|i| format!("LABEL_{i}")).collect();
    let values: Vec<i64>    = (0..num_labels as i64).collect();
    ModelMeta {
        config:    tiny_pretrained_config().with_labels(&names, &values),
        tokenizer: truncating_tokenizer(&tiny_tokenizer(), 16).expect("tiny tokenizer truncates"),
    }
}

/// A model directory with config.json and tokenizer.json but no weights.
pub fn write_tiny_model_dir(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    tiny_pretrained_config().save(&dir.join(CONFIG_FILE)).unwrap();
    TokenizerStore::new(dir).save(&tiny_tokenizer()).unwrap();
}

/// `rows` lines of `text,label` with labels cycling through 0..n_labels.
pub fn write_cycling_csv(path: &Path, rows: usize, n_labels: usize) {
    let mut out = String::from("text,label\n");
    for i in 0..rows {
        let label = i % n_labels;
        let text = match label {
            0 => "stocks fall on earnings miss",
            1 => "the market is flat and steady",
            _ => "shares rise after earnings beat",
        };
        out.push_str(&format!("\"{} {}\",{}\n", text, WORDS[i % WORDS.len()], label));
    }
    fs::write(path, out).unwrap();
}
