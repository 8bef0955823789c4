// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes the classifier with Burn's DataLoader and AdamW.
//
//   Initialized
//       │
//       ├─► TrainEpoch ─► EvaluateEpoch ─► CheckpointDecision ─┐
//       │        ▲                                             │
//       │        └──────────────── × epochs ───────────────────┘
//       ▼
//   BestModelSelected (weights of the best-F1 checkpoint reloaded)
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend so loss.backward() works
//   - model.valid() returns the model on B::InnerBackend: no
//     autodiff graph and dropout inactive, used for evaluation
//   - The DataLoader ends an epoch at the first missing item, so
//     every epoch's example count is checked against the dataset
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    data::dataset::Dataset,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{SentimentBatch, SentimentBatcher},
    dataset::TokenizedExample,
};
use crate::infra::{
    checkpoint::{CheckpointManager, TrainerState},
    metrics::{EpochMetrics, MetricsLogger},
    model_store::ModelMeta,
};
use crate::ml::{
    evaluation::{compute_metrics, EvalReport},
    model::SentimentModel,
    schedule::LinearSchedule,
};

pub struct TrainOutcome<B: AutodiffBackend> {
    /// Weights of the best checkpoint
    pub model: SentimentModel<B>,
    pub state: TrainerState,
}

/// Fine-tune `model` and return the weights of the best epoch.
/// `meta` is written next to the weights in every checkpoint.
#[allow(clippy::too_many_arguments)]
pub fn run_training<B, D, E>(
    cfg:         &TrainConfig,
    mut model:   SentimentModel<B>,
    train_ds:    D,
    eval_ds:     E,
    pad_id:      u32,
    meta:        &ModelMeta,
    checkpoints: &CheckpointManager,
    device:      &B::Device,
) -> Result<TrainOutcome<B>>
where
    B: AutodiffBackend,
    D: Dataset<TokenizedExample> + 'static,
    E: Dataset<TokenizedExample> + 'static,
{
    let logger    = MetricsLogger::new(checkpoints.dir())?;
    let train_len = train_ds.len();
    let eval_len  = eval_ds.len();
    anyhow::ensure!(train_len > 0, "training split is empty");
    anyhow::ensure!(cfg.batch_size > 0, "batch_size must be at least 1");

    let steps_per_epoch = train_len.div_ceil(cfg.batch_size);
    let schedule = LinearSchedule::new(cfg.lr, cfg.warmup_steps, steps_per_epoch * cfg.epochs);
    tracing::info!(
        "Training on {} examples, evaluating on {}: {} epochs x {} steps ({} total)",
        train_len,
        eval_len,
        cfg.epochs,
        steps_per_epoch,
        schedule.total_steps()
    );

    // ── AdamW optimiser ───────────────────────────────────────────────────────
    // θ = θ - lr * (m / (√v + ε) + λθ)   with gradient norm clipped to 1.0
    let mut optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay as f32)
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0)))
        .init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(SentimentBatcher::<B>::new(device.clone(), pad_id))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_ds);
    let held_out = eval_loader::<B::InnerBackend, _>(eval_ds, cfg.batch_size, pad_id, device);

    let mut state       = TrainerState::default();
    let mut global_step = 0usize;

    for epoch in 1..=cfg.epochs {
        // ── TrainEpoch ────────────────────────────────────────────────────────
        let mut epoch_loss   = 0.0f64;
        let mut epoch_steps  = 0usize;
        let mut window_loss  = 0.0f64;
        let mut window_steps = 0usize;
        let mut seen         = 0usize;

        for batch in train_loader.iter() {
            seen += batch.labels.dims()[0];
            let (loss, _) = model.forward_classification(batch);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

            let lr    = schedule.lr(global_step);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);

            global_step  += 1;
            epoch_steps  += 1;
            epoch_loss   += loss_val;
            window_loss  += loss_val;
            window_steps += 1;

            if cfg.logging_steps > 0 && global_step % cfg.logging_steps == 0 {
                let progress = (epoch - 1) as f64 + epoch_steps as f64 / steps_per_epoch as f64;
                let mean     = window_loss / window_steps as f64;
                logger.log_step(global_step, progress, mean, lr)?;
                tracing::info!("step {:>6} | epoch {:.2} | loss {:.4} | lr {:.3e}", global_step, progress, mean, lr);
                window_loss  = 0.0;
                window_steps = 0;
            }
        }

        if seen != train_len {
            bail!("epoch {epoch} produced {seen} of {train_len} training examples; see the error logged above");
        }

        // ── EvaluateEpoch ─────────────────────────────────────────────────────
        let report = evaluate(&model.valid(), held_out.as_ref(), eval_len)?;

        let metrics = EpochMetrics {
            epoch,
            step:       global_step,
            train_loss: epoch_loss / epoch_steps.max(1) as f64,
            eval_loss:  report.loss,
            accuracy:   report.metrics.accuracy,
            precision:  report.metrics.precision,
            recall:     report.metrics.recall,
            f1:         report.metrics.f1,
        };
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | eval_loss={:.4} | accuracy={:.4} | f1={:.4}",
            epoch,
            cfg.epochs,
            metrics.train_loss,
            metrics.eval_loss,
            metrics.accuracy,
            metrics.f1,
        );
        logger.log_epoch(&metrics)?;

        // ── CheckpointDecision ────────────────────────────────────────────────
        checkpoint_epoch(checkpoints, &mut state, &model, metrics, meta, cfg.save_total_limit)?;
    }

    // ── BestModelSelected ─────────────────────────────────────────────────────
    let model = restore_best(checkpoints, &state, model, device)?;

    tracing::info!("Training complete after {} steps", global_step);
    Ok(TrainOutcome { model, state })
}

/// Save this epoch's checkpoint, update the best-so-far, then prune
/// old checkpoints. Returns the new checkpoint's name.
fn checkpoint_epoch<B: Backend>(
    checkpoints: &CheckpointManager,
    state:       &mut TrainerState,
    model:       &SentimentModel<B>,
    metrics:     EpochMetrics,
    meta:        &ModelMeta,
    limit:       usize,
) -> Result<String> {
    let f1   = metrics.f1;
    let name = checkpoints.save_checkpoint(model, metrics.step, meta)?;
    if state.record_epoch(metrics, &name) {
        tracing::info!("New best checkpoint '{}' (f1={:.4})", name, f1);
    }
    checkpoints.save_state(Some(&name), state)?;
    checkpoints.rotate(limit, state.best_model_checkpoint.as_deref(), &name)?;
    Ok(name)
}

/// Reload the weights of the best checkpoint, if any epoch ran.
fn restore_best<B: Backend>(
    checkpoints: &CheckpointManager,
    state:       &TrainerState,
    model:       SentimentModel<B>,
    device:      &B::Device,
) -> Result<SentimentModel<B>> {
    match state.best_model_checkpoint.as_deref() {
        Some(best) => checkpoints.load_checkpoint(best, model, device),
        None => Ok(model),
    }
}

/// Sequential (unshuffled) loader over a labelled dataset.
pub fn eval_loader<B, D>(
    dataset:    D,
    batch_size: usize,
    pad_id:     u32,
    device:     &B::Device,
) -> Arc<dyn DataLoader<SentimentBatch<B>>>
where
    B: Backend,
    D: Dataset<TokenizedExample> + 'static,
{
    DataLoaderBuilder::new(SentimentBatcher::<B>::new(device.clone(), pad_id))
        .batch_size(batch_size)
        .num_workers(1)
        .build(dataset)
}

/// Run the model over a whole loader in inference mode.
/// `expected` is the number of examples the loader must yield.
pub fn evaluate<B: Backend>(
    model:    &SentimentModel<B>,
    loader:   &dyn DataLoader<SentimentBatch<B>>,
    expected: usize,
) -> Result<EvalReport> {
    let mut loss_sum = 0.0f64;
    let mut logits   = Vec::with_capacity(expected);
    let mut labels   = Vec::with_capacity(expected);

    for batch in loader.iter() {
        let gold: Vec<i64> = batch
            .labels
            .clone()
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("Cannot read labels: {e:?}"))?;

        let (loss, batch_logits) = model.forward_classification(batch);
        let [rows, classes] = batch_logits.dims();
        loss_sum += loss.into_scalar().elem::<f64>() * rows as f64;

        let flat: Vec<f32> = batch_logits
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read logits: {e:?}"))?;

        logits.extend(flat.chunks(classes).map(|row| row.to_vec()));
        labels.extend(gold.into_iter().map(|l| l as usize));
    }

    if labels.len() != expected {
        bail!("evaluation produced {} of {expected} examples; see the error logged above", labels.len());
    }

    Ok(EvalReport {
        loss:    if expected > 0 { loss_sum / expected as f64 } else { f64::NAN },
        metrics: compute_metrics(&logits, &labels),
    })
}
