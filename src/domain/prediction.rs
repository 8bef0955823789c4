use serde::{Deserialize, Serialize};

/// The top class for one text, with its softmax probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label:    String,
    pub class_id: usize,
    pub score:    f32,
}

impl Prediction {
    /// Turn one row of raw logits into a prediction.
    /// `names[i]` is the label string of class `i`.
    pub fn from_logits(logits: &[f32], names: &[String]) -> Option<Self> {
        if logits.is_empty() {
            return None;
        }
        let class_id = argmax(logits);
        let probs    = softmax(logits);
        let label    = names.get(class_id)?.clone();
        Some(Self { label, class_id, score: probs[class_id] })
    }
}

/// Index of the largest score. The first maximum wins ties,
/// matching numpy's argmax.
pub fn argmax(scores: &[f32]) -> usize {
    let mut best = 0usize;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

/// Numerically stable softmax over one row of logits.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
