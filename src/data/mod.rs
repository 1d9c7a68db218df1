// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw CSV files to batches the model consumes:
//
//   train.csv / test.csv
//       │
//       ▼
//   CsvLoader         → reads `text,label` rows into Samples
//       │
//       ▼
//   split_train_val   → seeded 90/10 train/validation partition
//       │
//       ▼
//   Preprocessor      → keeps the first 250 whitespace tokens
//       │
//       ▼
//   SampleDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   TextBatcher       → [N, 1] text column + [N, 1] label tensor
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads labelled CSV files
pub mod loader;

/// Whitespace-token truncation and column reshaping
pub mod preprocessor;

/// Implements Burn's Dataset trait for samples
pub mod dataset;

/// Implements Burn's Batcher trait
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
