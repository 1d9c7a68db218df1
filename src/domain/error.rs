// ============================================================
// Layer 3 — PipelineError
// ============================================================
// Every failure the pipeline can surface. None of them is
// recovered locally: they propagate to the process boundary.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input file is not valid CSV, lacks a required column, or holds a bad label.
    #[error("Malformed input file {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// Text field is not valid UTF-8.
    #[error("Non-decodable text in {path} at data row {row}")]
    Encoding { path: PathBuf, row: usize },

    /// Pretrained embedding module could not be resolved, downloaded or loaded.
    #[error("Cannot fetch pretrained module '{reference}': {reason}")]
    ModuleFetch { reference: String, reason: String },

    /// A file could not be read or written (input files, checkpoints, cache).
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Environment configuration rejected at startup.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A burn record could not be serialised or deserialised.
    #[error("Record error for {path}: {reason}")]
    Record { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn module_fetch(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::ModuleFetch {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}
