// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves a snapshot of the classifier after every epoch and keeps
// the number of snapshots on disk bounded.
//
// File layout:
//   roberta_financial_sentiment/
//     checkpoint-57/
//       model.mpk.gz          ← weights after epoch 1 (step 57)
//       config.json           ← encoder config + label maps
//       tokenizer.json        ← truncating tokenizer
//       trainer_state.json    ← metric history + best checkpoint
//     checkpoint-114/
//       ...
//     training_args.json      ← the TrainConfig of this run
//
// Every checkpoint is a complete model directory, so it can be
// passed to `annotate --model_dir` or `Inferencer::from_dir`.
//
// Retention rule (save_total_limit):
//   After each save, the oldest checkpoints are deleted until at
//   most `limit` remain. Two are never deleted: the checkpoint
//   holding the best eval F1 and the one just written (so a limit
//   of 1 can leave two on disk). Leftovers from an earlier run in
//   the same directory count as ordinary old checkpoints. With limit = 2 and three
//   epochs where epoch 1 scored best:
//
//     after epoch 3:  checkpoint-57 (best), checkpoint-171
//
// Weights are written with Burn's NamedMpkGzFileRecorder at full
// precision: MessagePack, gzip-compressed, type-checked on load.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::infra::metrics::EpochMetrics;
use crate::infra::model_store::{save_pretrained, ModelMeta};
use crate::ml::model::SentimentModel;

pub type ModelRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// File stem the recorder writes to; it appends `.mpk.gz` itself.
pub const WEIGHTS_STEM: &str = "model";
pub const WEIGHTS_FILE: &str = "model.mpk.gz";
pub const STATE_FILE: &str = "trainer_state.json";
pub const ARGS_FILE: &str = "training_args.json";
const CHECKPOINT_PREFIX: &str = "checkpoint-";

/// Write model weights to `{stem}.mpk.gz`.
pub fn save_weights<B: Backend>(model: &SentimentModel<B>, stem: &Path) -> Result<()> {
    ModelRecorder::new()
        .record(model.clone().into_record(), stem.to_path_buf())
        .with_context(|| format!("Failed to save weights to '{}'", stem.display()))
}

/// Load weights from `{stem}.mpk.gz` into a model of the same shape.
pub fn load_weights<B: Backend>(
    model:  SentimentModel<B>,
    stem:   &Path,
    device: &B::Device,
) -> Result<SentimentModel<B>> {
    let record = ModelRecorder::new()
        .load(stem.to_path_buf(), device)
        .with_context(|| format!("Cannot load weights '{}'", stem.display()))?;
    Ok(model.load_record(record))
}

// ─── TrainerState ─────────────────────────────────────────────────────────────
/// Progress of a run, written into every checkpoint and the
/// final output directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerState {
    pub epoch:                 usize,
    pub global_step:           usize,
    pub best_metric:           Option<f64>,
    pub best_model_checkpoint: Option<String>,
    pub log_history:           Vec<EpochMetrics>,
}

impl TrainerState {
    /// Record an epoch. Returns true if it became the new best
    /// (strictly greater F1; ties keep the earlier checkpoint).
    pub fn record_epoch(&mut self, metrics: EpochMetrics, checkpoint: &str) -> bool {
        self.epoch       = metrics.epoch;
        self.global_step = metrics.step;
        let improved = metrics.is_improvement(self.best_metric);
        if improved {
            self.best_metric           = Some(metrics.f1);
            self.best_model_checkpoint = Some(checkpoint.to_string());
        }
        self.log_history.push(metrics);
        improved
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Manages the checkpoint directories of one training run.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the run directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint_name(step: usize) -> String {
        format!("{CHECKPOINT_PREFIX}{step}")
    }

    /// Save `checkpoint-{step}` as a loadable model directory;
    /// returns the checkpoint name.
    pub fn save_checkpoint<B: Backend>(
        &self,
        model: &SentimentModel<B>,
        step:  usize,
        meta:  &ModelMeta,
    ) -> Result<String> {
        let name = Self::checkpoint_name(step);
        save_pretrained(&self.dir.join(&name), model, meta)
            .with_context(|| format!("Cannot save checkpoint '{name}'"))?;
        tracing::debug!("Saved checkpoint '{}'", name);
        Ok(name)
    }

    /// Load the weights of a named checkpoint.
    pub fn load_checkpoint<B: Backend>(
        &self,
        name:   &str,
        model:  SentimentModel<B>,
        device: &B::Device,
    ) -> Result<SentimentModel<B>> {
        tracing::info!("Loading weights from '{}'", name);
        load_weights(model, &self.dir.join(name).join(WEIGHTS_STEM), device)
    }

    /// Write `trainer_state.json` into a checkpoint (or into the run
    /// directory itself when `name` is None).
    pub fn save_state(&self, name: Option<&str>, state: &TrainerState) -> Result<()> {
        let dir = match name {
            Some(n) => self.dir.join(n),
            None => self.dir.clone(),
        };
        let path = dir.join(STATE_FILE);
        fs::write(&path, serde_json::to_string_pretty(state)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    #[cfg(test)]
    pub fn load_state(&self, name: Option<&str>) -> Result<TrainerState> {
        let dir = match name {
            Some(n) => self.dir.join(n),
            None => self.dir.clone(),
        };
        let path = dir.join(STATE_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Checkpoints on disk as (step, name), oldest first.
    pub fn list_checkpoints(&self) -> Result<Vec<(usize, String)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(step) = name
                .strip_prefix(CHECKPOINT_PREFIX)
                .and_then(|s| s.parse::<usize>().ok())
            {
                found.push((step, name));
            }
        }
        found.sort();
        Ok(found)
    }

    /// Delete the oldest checkpoints until at most `limit` remain,
    /// never deleting `best` or `current` (the one just written).
    /// A limit of 0 keeps everything. Returns the names removed.
    pub fn rotate(&self, limit: usize, best: Option<&str>, current: &str) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let checkpoints = self.list_checkpoints()?;
        let excess      = checkpoints.len().saturating_sub(limit);

        let doomed: Vec<String> = checkpoints
            .into_iter()
            .map(|(_, name)| name)
            .filter(|name| Some(name.as_str()) != best && name != current)
            .take(excess)
            .collect();

        for name in &doomed {
            let path = self.dir.join(name);
            fs::remove_dir_all(&path)
                .with_context(|| format!("Cannot delete old checkpoint '{}'", path.display()))?;
            tracing::info!("Deleted older checkpoint '{}' (save_total_limit={})", name, limit);
        }
        Ok(doomed)
    }

    /// Save the run configuration as `training_args.json`.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(ARGS_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    #[cfg(test)]
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(ARGS_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn fake_checkpoints(mgr: &CheckpointManager, steps: &[usize]) {
        for &s in steps {
            fs::create_dir_all(mgr.dir().join(CheckpointManager::checkpoint_name(s))).unwrap();
        }
    }

    fn names(mgr: &CheckpointManager) -> Vec<String> {
        mgr.list_checkpoints().unwrap().into_iter().map(|(_, n)| n).collect()
    }

    fn epoch(epoch: usize, step: usize, f1: f64) -> EpochMetrics {
        EpochMetrics { epoch, step, f1, ..Default::default() }
    }

    #[test]
    fn test_list_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        fake_checkpoints(&mgr, &[100, 20, 3]);
        fs::create_dir_all(dir.path().join("logs")).unwrap();
        assert_eq!(names(&mgr), vec!["checkpoint-3", "checkpoint-20", "checkpoint-100"]);
    }

    #[test]
    fn test_rotate_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        fake_checkpoints(&mgr, &[10, 20, 30]);
        let removed = mgr.rotate(2, Some("checkpoint-30"), "checkpoint-30").unwrap();
        assert_eq!(removed, vec!["checkpoint-10"]);
        assert_eq!(names(&mgr), vec!["checkpoint-20", "checkpoint-30"]);
    }

    #[test]
    fn test_rotate_never_deletes_best() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        fake_checkpoints(&mgr, &[10, 20, 30]);
        mgr.rotate(2, Some("checkpoint-10"), "checkpoint-30").unwrap();
        assert_eq!(names(&mgr), vec!["checkpoint-10", "checkpoint-30"]);
    }

    #[test]
    fn test_rotate_limit_one_keeps_best_and_newest() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        fake_checkpoints(&mgr, &[10, 20, 30]);
        mgr.rotate(1, Some("checkpoint-10"), "checkpoint-30").unwrap();
        assert_eq!(names(&mgr), vec!["checkpoint-10", "checkpoint-30"]);
    }

    #[test]
    fn test_rotate_zero_limit_keeps_all() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        fake_checkpoints(&mgr, &[1, 2, 3]);
        assert!(mgr.rotate(0, None, "checkpoint-3").unwrap().is_empty());
        assert_eq!(names(&mgr).len(), 3);
    }

    #[test]
    fn test_rotate_protects_current_over_leftover_from_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        // checkpoint-1000 is left over from a longer run in the same directory
        fake_checkpoints(&mgr, &[10, 20, 1000]);
        let removed = mgr.rotate(2, Some("checkpoint-10"), "checkpoint-20").unwrap();
        assert_eq!(removed, vec!["checkpoint-1000"]);
        assert_eq!(names(&mgr), vec!["checkpoint-10", "checkpoint-20"]);
    }

    #[test]
    fn test_checkpoint_is_a_loadable_model_directory() {
        use crate::infra::model_store::{ModelFiles, PretrainedConfig, Weights, CONFIG_FILE};
        use crate::infra::tokenizer_store::TOKENIZER_FILE;
        use crate::test_support::{tiny_meta, tiny_model_config};
        use burn::backend::NdArray;

        let dir   = tempfile::tempdir().unwrap();
        let mgr   = CheckpointManager::new(dir.path()).unwrap();
        let model = tiny_model_config(3).init::<NdArray>(&Default::default());

        let name = mgr.save_checkpoint(&model, 7, &tiny_meta(3)).unwrap();
        let ckpt = dir.path().join(&name);
        for file in [WEIGHTS_FILE, CONFIG_FILE, TOKENIZER_FILE] {
            assert!(ckpt.join(file).is_file(), "missing {file}");
        }
        assert!(matches!(ModelFiles::from_dir(&ckpt).unwrap().weights, Weights::FineTuned(_)));
        let config = PretrainedConfig::load(&ckpt.join(CONFIG_FILE)).unwrap();
        assert_eq!(config.label_names(), vec!["LABEL_0", "LABEL_1", "LABEL_2"]);
    }

    #[test]
    fn test_best_tracks_highest_f1() {
        let mut state = TrainerState::default();
        assert!(state.record_epoch(epoch(1, 10, 0.50), "checkpoint-10"));
        assert!(state.record_epoch(epoch(2, 20, 0.70), "checkpoint-20"));
        assert!(!state.record_epoch(epoch(3, 30, 0.60), "checkpoint-30"));
        // ties keep the earlier checkpoint
        assert!(!state.record_epoch(epoch(4, 40, 0.70), "checkpoint-40"));

        assert_eq!(state.best_model_checkpoint.as_deref(), Some("checkpoint-20"));
        assert_eq!(state.best_metric, Some(0.70));
        assert_eq!(state.global_step, 40);
        assert_eq!(state.log_history.len(), 4);
    }

    #[test]
    fn test_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        let mut state = TrainerState::default();
        state.record_epoch(epoch(1, 5, 0.4), "checkpoint-5");
        mgr.save_state(None, &state).unwrap();
        assert_eq!(mgr.load_state(None).unwrap(), state);
    }
}
