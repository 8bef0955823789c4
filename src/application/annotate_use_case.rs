// ============================================================
// Layer 2 — AnnotateUseCase
// ============================================================
// Labels every row of a table with a fine-tuned model:
//
//   Step 1: Read the CSV                    (Layer 4 - data)
//   Step 2: Load the model directory        (Layer 5 - ml)
//   Step 3: Predict, batch_size rows a time (Layer 5 - ml)
//   Step 4: Append the `sentiment` column   (Layer 4 - data)
//   Step 5: Write the CSV                   (Layer 4 - data)
//
// The output keeps every input row and column in order. Training
// rows are labelled too: this is corpus annotation, not held-out
// evaluation (see EvaluateUseCase for that).

use anyhow::Result;
use burn::backend::Wgpu;
use std::path::PathBuf;

use crate::data::table::CorpusTable;
use crate::domain::traits::SentimentClassifier;
use crate::infra::device::DeviceChoice;
use crate::ml::inferencer::Inferencer;

/// Name of the prediction column appended to the table.
pub const SENTIMENT_COLUMN: &str = "sentiment";

/// Predict a label for every row of `table` and return a copy with
/// the `sentiment` column added.
pub fn annotate_table<C: SentimentClassifier + ?Sized>(
    classifier:  &C,
    table:       &CorpusTable,
    text_column: &str,
    batch_size:  usize,
) -> Result<CorpusTable> {
    let texts = table.texts(text_column)?;
    let total = texts.len();
    let mut labels = Vec::with_capacity(total);

    for chunk in texts.chunks(batch_size.max(1)) {
        let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
        let predictions = classifier.predict_batch(&refs)?;
        labels.extend(predictions.into_iter().map(|p| p.label));
        tracing::debug!("Annotated {}/{} rows", labels.len(), total);
    }

    tracing::info!("Annotated {} rows", total);
    table.with_column(SENTIMENT_COLUMN, labels)
}

// ─── AnnotateUseCase ──────────────────────────────────────────────────────────
pub struct AnnotateUseCase {
    pub model_dir:   PathBuf,
    pub data_path:   PathBuf,
    pub output_path: PathBuf,
    pub text_column: String,
    pub batch_size:  usize,
    pub device:      DeviceChoice,
}

impl AnnotateUseCase {
    /// Returns the number of rows written.
    pub fn execute(&self) -> Result<usize> {
        let device = self.device.wgpu_device();
        tracing::info!("Using WGPU device: {:?}", device);

        let table      = CorpusTable::read(&self.data_path)?;
        let inferencer = Inferencer::<Wgpu>::from_dir(&self.model_dir, device, self.batch_size)?;
        let labelled   = annotate_table(&inferencer, &table, &self.text_column, self.batch_size)?;
        labelled.write(&self.output_path)?;
        Ok(labelled.len())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Scores "rise" texts as class 2, "fall" as class 0, else 1.
    struct KeywordClassifier {
        names: Vec<String>,
        calls: Cell<usize>,
    }

    impl KeywordClassifier {
        fn new() -> Self {
            Self {
                names: vec!["LABEL_0".into(), "LABEL_1".into(), "LABEL_2".into()],
                calls: Cell::new(0),
            }
        }
    }

    impl SentimentClassifier for KeywordClassifier {
        fn class_scores(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.set(self.calls.get() + 1);
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("rise") {
                        vec![0.0, 0.0, 5.0]
                    } else if t.contains("fall") {
                        vec![5.0, 0.0, 0.0]
                    } else {
                        vec![0.0, 5.0, 0.0]
                    }
                })
                .collect())
        }

        fn label_names(&self) -> &[String] {
            &self.names
        }
    }

    fn table() -> CorpusTable {
        let csv = "id,text,label\n1,stocks rise,2\n2,stocks fall,0\n3,flat day,1\n4,shares rise,2\n5,\"fall, again\",0\n";
        CorpusTable::from_reader(csv.as_bytes(), "test.csv").unwrap()
    }

    #[test]
    fn test_adds_sentiment_column_row_for_row() {
        let clf = KeywordClassifier::new();
        let out = annotate_table(&clf, &table(), "text", 2).unwrap();

        assert_eq!(out.len(), 5);
        assert_eq!(out.headers(), vec!["id", "text", "label", "sentiment"]);

        let mut buf = Vec::new();
        out.to_writer(&mut buf).unwrap();
        let written = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[1], "1,stocks rise,2,LABEL_2");
        assert_eq!(lines[3], "3,flat day,1,LABEL_1");
        assert_eq!(lines[5], "5,\"fall, again\",0,LABEL_0");
    }

    #[test]
    fn test_runs_in_batches() {
        let clf = KeywordClassifier::new();
        annotate_table(&clf, &table(), "text", 2).unwrap();
        assert_eq!(clf.calls.get(), 3);
    }

    #[test]
    fn test_missing_text_column_is_an_error() {
        let clf = KeywordClassifier::new();
        assert!(annotate_table(&clf, &table(), "headline", 2).is_err());
    }
}
