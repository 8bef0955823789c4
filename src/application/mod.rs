// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal each: fine-tune and label a corpus, label a table with an
// existing model, score an existing model, or classify one text.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing or printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The full training workflow
pub mod train_use_case;

// Label every row of a table with a saved model
pub mod annotate_use_case;

// Score a saved model on a labelled table
pub mod evaluate_use_case;

// Classify texts given on the command line
pub mod predict_use_case;
