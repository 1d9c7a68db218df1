// ============================================================
// Layer 4 — CSV Loader
// ============================================================
// Reads a tabular file with a header row containing at least the
// `text` and `label` columns. Columns may appear in any order and
// extra columns are ignored.
//
// Every problem with the file is fatal:
//   - unreadable file, bad CSV, missing column, bad label → Format
//   - text that is not valid UTF-8                         → Encoding
//
// Reference: csv crate documentation

use std::path::{Path, PathBuf};

use crate::data::splitter::split_train_val;
use crate::domain::{
    error::PipelineError,
    sample::{Label, Sample},
    traits::SampleSource,
};

pub const TEXT_COLUMN: &str = "text";
pub const LABEL_COLUMN: &str = "label";

/// Loads labelled samples from one CSV file.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn column_index(&self, headers: &csv::StringRecord, name: &str) -> Result<usize, PipelineError> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| {
                PipelineError::format(&self.path, format!("missing required column '{name}'"))
            })
    }

    fn map_csv_error(&self, row: usize, err: csv::Error) -> PipelineError {
        match err.kind() {
            csv::ErrorKind::Utf8 { .. } => PipelineError::Encoding {
                path: self.path.clone(),
                row,
            },
            _ => PipelineError::format(&self.path, format!("data row {row}: {err}")),
        }
    }
}

impl SampleSource for CsvLoader {
    fn load_all(&self) -> Result<Vec<Sample>, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| PipelineError::format(&self.path, format!("cannot open: {e}")))?;

        let headers = reader
            .headers()
            .map_err(|e| PipelineError::format(&self.path, format!("bad header row: {e}")))?
            .clone();
        let text_idx = self.column_index(&headers, TEXT_COLUMN)?;
        let label_idx = self.column_index(&headers, LABEL_COLUMN)?;

        let mut samples = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| self.map_csv_error(row, e))?;

            let text = record.get(text_idx).ok_or_else(|| {
                PipelineError::format(&self.path, format!("data row {row} has no '{TEXT_COLUMN}' field"))
            })?;
            let raw_label = record.get(label_idx).ok_or_else(|| {
                PipelineError::format(&self.path, format!("data row {row} has no '{LABEL_COLUMN}' field"))
            })?;
            let label = parse_label(raw_label).ok_or_else(|| {
                PipelineError::format(
                    &self.path,
                    format!("data row {row} has label '{raw_label}', expected 0 or 1"),
                )
            })?;

            samples.push(Sample::new(row, text, label));
        }

        tracing::info!("Loaded {} samples from '{}'", samples.len(), self.path.display());
        Ok(samples)
    }
}

/// Accepts `0`/`1` and their integral float spellings (`1.0`).
fn parse_label(raw: &str) -> Option<Label> {
    let raw = raw.trim();
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f = raw.parse::<f64>().ok()?;
            if f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };
    Label::from_index(value)
}

// ─── Dataset Splits ───────────────────────────────────────────────────────────
/// Train, validation and test samples for one run.
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    pub train: Vec<Sample>,
    pub validation: Vec<Sample>,
    pub test: Vec<Sample>,
}

impl DatasetSplits {
    pub fn test_xy(&self) -> (Vec<String>, Vec<Label>) {
        unzip(&self.test)
    }
}

fn unzip(samples: &[Sample]) -> (Vec<String>, Vec<Label>) {
    samples.iter().map(|s| (s.text.clone(), s.label)).unzip()
}

/// Read both files and carve the validation split off the training file.
pub fn load_data(
    train_path: impl Into<PathBuf>,
    test_path: impl Into<PathBuf>,
    val_fraction: f64,
    seed: u64,
) -> Result<DatasetSplits, PipelineError> {
    let train_all = CsvLoader::new(train_path).load_all()?;
    let test = CsvLoader::new(test_path).load_all()?;

    let (train, validation) = split_train_val(train_all, val_fraction, seed);

    Ok(DatasetSplits {
        train,
        validation,
        test,
    })
}
