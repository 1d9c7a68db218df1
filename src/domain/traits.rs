// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits, so a
// different input format only needs a new implementation.

use crate::domain::{error::PipelineError, sample::Sample};

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can produce labelled samples.
///
/// Implementations:
///   - CsvLoader → reads a `text,label` CSV file
pub trait SampleSource {
    /// Load every sample, in source order.
    fn load_all(&self) -> Result<Vec<Sample>, PipelineError>;
}
