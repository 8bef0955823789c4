// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training progress to two CSV files under
// {output_dir}/logs/:
//
//   train_loss.csv   one row every `logging_steps` optimiser steps
//     step,epoch,loss,learning_rate
//     50,0.877193,0.912345,0.00001
//
//   metrics.csv      one row per epoch, after held-out evaluation
//     epoch,step,train_loss,eval_loss,accuracy,precision,recall,f1
//     1,57,0.843100,0.701200,0.712000,0.705400,0.712000,0.704900
//
// Rows are appended, so a rerun into the same output directory
// keeps the earlier history below the same header.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const LOGS_DIR: &str = "logs";
const STEP_FILE: &str = "train_loss.csv";
const EPOCH_FILE: &str = "metrics.csv";

const STEP_HEADER: &str = "step,epoch,loss,learning_rate";
const EPOCH_HEADER: &str = "epoch,step,train_loss,eval_loss,accuracy,precision,recall,f1";

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Global optimiser step at the end of the epoch
    pub step: usize,

    /// Mean cross-entropy over the epoch's training batches
    pub train_loss: f64,

    /// Mean cross-entropy over the held-out split
    pub eval_loss: f64,

    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,

    /// Support-weighted F1, the model-selection metric
    pub f1: f64,
}

impl EpochMetrics {
    /// True if this epoch's F1 is strictly better than the best so far.
    pub fn is_improvement(&self, best_f1: Option<f64>) -> bool {
        match best_f1 {
            Some(best) => self.f1 > best,
            None => true,
        }
    }
}

/// Appends step and epoch metrics to CSV files.
pub struct MetricsLogger {
    step_path:  PathBuf,
    epoch_path: PathBuf,
}

impl MetricsLogger {
    /// Create `{output_dir}/logs/` and write headers for new files.
    pub fn new(output_dir: &Path) -> Result<Self> {
        let dir = output_dir.join(LOGS_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let step_path  = dir.join(STEP_FILE);
        let epoch_path = dir.join(EPOCH_FILE);
        write_header(&step_path, STEP_HEADER)?;
        write_header(&epoch_path, EPOCH_HEADER)?;

        Ok(Self { step_path, epoch_path })
    }

    /// Append one training-loss row.
    pub fn log_step(&self, step: usize, epoch: f64, loss: f64, lr: f64) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.step_path)?;
        writeln!(f, "{},{:.6},{:.6},{}", step, epoch, loss, lr)?;
        Ok(())
    }

    /// Append one epoch row.
    pub fn log_epoch(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.epoch_path)?;
        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.step, m.train_loss, m.eval_loss, m.accuracy, m.precision, m.recall, m.f1,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: eval_loss={:.4}, f1={:.4}",
            m.epoch,
            m.eval_loss,
            m.f1,
        );
        Ok(())
    }

    pub fn step_path(&self) -> &Path {
        &self.step_path
    }

    pub fn epoch_path(&self) -> &Path {
        &self.epoch_path
    }
}

fn write_header(path: &Path, header: &str) -> Result<()> {
    if !path.exists() {
        let mut f = fs::File::create(path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        writeln!(f, "{header}")?;
        tracing::debug!("Created metrics CSV: '{}'", path.display());
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics { f1: 0.7, ..Default::default() };
        assert!(m.is_improvement(None));
        assert!(m.is_improvement(Some(0.6)));
        assert!(!m.is_improvement(Some(0.7)));
        assert!(!m.is_improvement(Some(0.8)));
    }

    #[test]
    fn test_logs_append_below_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log_step(50, 0.5, 1.0986, 2e-5).unwrap();
        logger.log_step(100, 1.0, 0.9, 1e-5).unwrap();
        logger.log_epoch(&EpochMetrics { epoch: 1, step: 100, f1: 0.5, ..Default::default() }).unwrap();

        // reopening must not duplicate headers
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log_epoch(&EpochMetrics { epoch: 2, step: 200, ..Default::default() }).unwrap();

        let steps = fs::read_to_string(logger.step_path()).unwrap();
        let lines: Vec<&str> = steps.lines().collect();
        assert_eq!(lines[0], STEP_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("50,0.500000,1.098600,"));

        let epochs = fs::read_to_string(logger.epoch_path()).unwrap();
        assert_eq!(epochs.lines().filter(|l| l.starts_with("epoch,")).count(), 1);
        assert_eq!(epochs.lines().count(), 3);
    }
}
