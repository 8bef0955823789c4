// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   model_store.rs     — config.json, model directory layout,
//                        Hugging Face Hub downloads, and writing
//                        the final fine-tuned model directory
//
//   tokenizer_store.rs — tokenizer.json persistence
//
//   checkpoint.rs      — per-epoch checkpoints, trainer state
//                        and save_total_limit rotation
//
//   metrics.rs         — step and epoch metric CSV logs
//
//   device.rs          — `--device` flag → WGPU device
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving, loading and rotation
pub mod checkpoint;

/// WGPU device selection
pub mod device;

/// Training metrics CSV logger
pub mod metrics;

/// Model directory layout and config.json
pub mod model_store;

/// Tokenizer saving and loading
pub mod tokenizer_store;
