// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that runs a tensor:
//
//   model.rs      — RoBERTa encoder + sentence-classification head
//   weights.rs    — builds the model from fine-tuned, pretrained
//                   PyTorch, or no weights
//   schedule.rs   — linear warmup / linear decay learning rate
//   evaluation.rs — accuracy and support-weighted P / R / F1
//   trainer.rs    — training loop, per-epoch evaluation, best
//                   checkpoint selection
//   inferencer.rs — loads a saved model and predicts in batches
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Liu et al. (2019) RoBERTa

/// RoBERTa sequence classifier architecture
pub mod model;

/// Weight loading and PyTorch checkpoint import
pub mod weights;

/// Learning-rate schedule
pub mod schedule;

/// Classification metrics
pub mod evaluation;

/// Full training loop with evaluation and checkpointing
pub mod trainer;

/// Inference engine: loads a saved model and predicts labels
pub mod inferencer;
