// ============================================================
// Layer 3 — Record and LabelSpace
// ============================================================
// A Record is one row of the source corpus: free text plus the
// integer label it was annotated with.
//
// The classifier never sees raw label values. LabelSpace sorts
// the distinct values found in a table and assigns each one a
// dense class id, so a corpus labelled {-1, 0, 1} or {0, 1, 2}
// both end up as classes 0..3:
//
//   raw label:  -1   0   1
//   class id:    0   1   2

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One labelled row of the input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub text:  String,
    pub label: i64,
}

impl Record {
    pub fn new(text: impl Into<String>, label: i64) -> Self {
        Self { text: text.into(), label }
    }
}

/// Sorted set of distinct raw label values; the index of a value
/// is its class id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpace {
    values: Vec<i64>,
}

impl LabelSpace {
    /// Build the label space from every label observed in a table.
    pub fn from_labels(labels: impl IntoIterator<Item = i64>) -> Self {
        let values: BTreeSet<i64> = labels.into_iter().collect();
        Self { values: values.into_iter().collect() }
    }

    /// Rebuild a label space that was saved alongside a model.
    /// Values are sorted and deduplicated so ids stay dense.
    pub fn from_values(values: Vec<i64>) -> Self {
        Self::from_labels(values)
    }

    /// Number of classes, which sizes the classifier head.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Class id of a raw label, if the label belongs to this space.
    pub fn class_of(&self, label: i64) -> Option<usize> {
        self.values.binary_search(&label).ok()
    }

    /// Raw labels of this space that never occur in `labels`.
    pub fn missing_from(&self, labels: &[i64]) -> Vec<i64> {
        let seen: BTreeSet<i64> = labels.iter().copied().collect();
        self.values
            .iter()
            .filter(|v| !seen.contains(v))
            .copied()
            .collect()
    }

    /// Default class names, matching the `LABEL_{id}` convention
    /// of Hugging Face sequence classifiers.
    pub fn default_names(&self) -> Vec<String> {
        (0..self.len()).map(|i| format!("LABEL_{i}")).collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_count_matches_distinct_labels() {
        let labels = vec![2, 0, 1, 1, 0, 2, 2, 0];
        let space  = LabelSpace::from_labels(labels);
        assert_eq!(space.len(), 3);
        assert_eq!(space.values(), &[0, 1, 2]);
    }

    #[test]
    fn test_non_contiguous_labels_get_dense_ids() {
        let space = LabelSpace::from_labels(vec![1, -1, 1, 0]);
        assert_eq!(space.class_of(-1), Some(0));
        assert_eq!(space.class_of(0),  Some(1));
        assert_eq!(space.class_of(1),  Some(2));
        assert_eq!(space.class_of(7),  None);
    }

    #[test]
    fn test_missing_from_reports_uncovered_labels() {
        let space = LabelSpace::from_labels(vec![0, 1, 2]);
        assert_eq!(space.missing_from(&[0, 0, 2]), vec![1]);
        assert!(space.missing_from(&[2, 1, 0]).is_empty());
    }

    #[test]
    fn test_default_names() {
        let space = LabelSpace::from_values(vec![2, 0, 1]);
        assert_eq!(space.default_names(), vec!["LABEL_0", "LABEL_1", "LABEL_2"]);
    }
}
