// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// pipeline works with: labelled samples, text columns, the
// error taxonomy, and the classification report.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

// A labelled (text, label) row from a CSV file
pub mod sample;

// The [N, 1] string column the embedder consumes
pub mod text_column;

// PipelineError — the failure taxonomy of a run
pub mod error;

// Confusion matrix and per-class precision/recall/F1
pub mod report;

// Core abstractions (traits) that other layers implement
pub mod traits;
