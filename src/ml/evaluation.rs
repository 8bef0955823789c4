// ============================================================
// Layer 5 — Classification Metrics
// ============================================================
// Turns logits and gold class ids into the four numbers used for
// model selection and reporting.
//
//   prediction  = argmax of each logits row (first maximum wins)
//   accuracy    = correct / total
//   precision,
//   recall, f1  = per-class scores averaged with weights equal to
//                 each class's gold support
//
// Per-class scores range over every class that appears in either
// the gold or the predicted labels. A class with no predictions
// has precision 0; a class with no gold rows has weight 0.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::prediction::argmax;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
}

impl EvalMetrics {
    /// Metric name → value.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "accuracy"  => Some(self.accuracy),
            "precision" => Some(self.precision),
            "recall"    => Some(self.recall),
            "f1"        => Some(self.f1),
            _ => None,
        }
    }
}

/// Mean loss and metrics over one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub loss:    f64,
    pub metrics: EvalMetrics,
}

impl EvalReport {
    /// Score logits computed outside a tensor backend.
    pub fn from_logits(logits: &[Vec<f32>], labels: &[usize]) -> Self {
        Self {
            loss:    cross_entropy(logits, labels),
            metrics: compute_metrics(logits, labels),
        }
    }

    /// `eval_`-prefixed results, as written to eval_results.json.
    pub fn to_results(&self, samples: usize) -> BTreeMap<String, f64> {
        let mut out: BTreeMap<String, f64> = self
            .metrics
            .to_map()
            .into_iter()
            .map(|(k, v)| (format!("eval_{k}"), v))
            .collect();
        out.insert("eval_loss".to_string(), self.loss);
        out.insert("eval_samples".to_string(), samples as f64);
        out
    }
}

#[derive(Default)]
struct ClassCounts {
    tp:      usize,
    fp:      usize,
    fn_:     usize,
    support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Mean cross-entropy of logits rows against gold class ids.
/// A gold id outside a row counts as an infinite loss.
pub fn cross_entropy(logits: &[Vec<f32>], labels: &[usize]) -> f64 {
    let n = logits.len().min(labels.len());
    if n == 0 {
        return f64::NAN;
    }
    let total: f64 = logits
        .iter()
        .zip(labels)
        .map(|(row, &gold)| {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
            let log_sum = row.iter().map(|&x| (x as f64 - max).exp()).sum::<f64>().ln() + max;
            row.get(gold).map_or(f64::INFINITY, |&x| log_sum - x as f64)
        })
        .sum();
    total / n as f64
}

/// Score argmax predictions against gold class ids.
/// Rows beyond the shorter of the two inputs are ignored.
pub fn compute_metrics(logits: &[Vec<f32>], labels: &[usize]) -> EvalMetrics {
    let preds: Vec<usize> = logits.iter().map(|row| argmax(row)).collect();
    score(&preds, labels)
}

/// Score predicted class ids against gold class ids.
pub fn score(preds: &[usize], labels: &[usize]) -> EvalMetrics {
    let n = preds.len().min(labels.len());
    if n == 0 {
        return EvalMetrics::default();
    }

    let classes: BTreeSet<usize> = preds[..n].iter().chain(&labels[..n]).copied().collect();
    let mut counts: BTreeMap<usize, ClassCounts> =
        classes.into_iter().map(|c| (c, ClassCounts::default())).collect();

    let mut correct = 0;
    for (&p, &g) in preds.iter().zip(labels).take(n) {
        counts.entry(g).or_default().support += 1;
        if p == g {
            correct += 1;
            counts.entry(g).or_default().tp += 1;
        } else {
            counts.entry(p).or_default().fp += 1;
            counts.entry(g).or_default().fn_ += 1;
        }
    }

    let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
    for c in counts.values() {
        let weight = c.support as f64 / n as f64;
        let p = ratio(c.tp, c.tp + c.fp);
        let r = ratio(c.tp, c.tp + c.fn_);
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
        precision += weight * p;
        recall    += weight * r;
        f1        += weight * f;
    }

    EvalMetrics {
        accuracy: correct as f64 / n as f64,
        precision,
        recall,
        f1,
    }
}
