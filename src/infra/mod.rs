// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the machine or the disk:
//
//   environment.rs  — Compute device selection
//                     Picks the WGPU adapter and validates the
//                     per-process memory budget before any
//                     tensor is allocated.
//
//   module_store.rs — Pretrained ELMo weights
//                     Resolves --module / ELMO_MODULE_URL,
//                     downloads and caches remote records, and
//                     loads them into the embedder.
//
//   checkpoint.rs   — Saving and loading model weights
//                     Writes a record per improving epoch plus
//                     a pointer to the best one and the run
//                     config needed to rebuild the model.
//
//   metrics.rs      — Training metrics logging
//                     Appends epoch-level loss and accuracy to
//                     a CSV file next to the checkpoints.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Device selection and memory budget
pub mod environment;

/// Pretrained module resolution, download cache, and loading
pub mod module_store;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
