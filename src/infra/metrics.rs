// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch to {model_dir}/metrics.csv:
//
//   epoch,train_loss,train_acc,val_loss,val_acc
//   1,0.612300,0.671100,0.588400,0.700000
//   2,0.498100,0.774400,0.561200,0.720000
//
// The file (and its directory) is created on the first write, so
// an unwritable directory does not fail the run before training.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean binary cross-entropy over training batches
    pub train_loss: f64,

    /// Fraction of training samples classified correctly
    pub train_acc: f64,

    /// Mean binary cross-entropy over validation batches
    pub val_loss: f64,

    /// Fraction of validation samples classified correctly
    pub val_acc: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, train_acc: f64, val_loss: f64, val_acc: f64) -> Self {
        Self { epoch, train_loss, train_acc, val_loss, val_acc }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    dir:      PathBuf,
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let csv_path = dir.join("metrics.csv");
        Self { dir, csv_path }
    }

    /// Append one epoch's metrics, writing the header first if the file is new.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let is_new = !self.csv_path.exists();
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        if is_new {
            writeln!(f, "epoch,train_loss,train_acc,val_loss,val_acc")?;
        }
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.train_acc, m.val_loss, m.val_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_acc={:.4}",
            m.epoch,
            m.train_loss,
            m.val_acc,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
