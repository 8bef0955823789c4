// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the CSV file on disk to padded tensor batches.
//
//   stock_data.csv
//       │
//       ▼
//   CorpusTable        → reads rows, keeps every column for output
//       │
//       ▼
//   stratified_split   → seeded train / held-out partition
//       │
//       ▼
//   SentimentDataset   → tokenises one text per access
//       │
//       ▼
//   SentimentBatcher   → pads each batch to its longest sequence
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Typed input-table errors
pub mod error;

/// CSV input and labelled output
pub mod table;

/// Stratified train / held-out split
pub mod splitter;

/// Implements Burn's Dataset trait with lazy tokenisation
pub mod dataset;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;
