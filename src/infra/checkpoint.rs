// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists model weights whenever validation accuracy beats every
// earlier epoch of the run.
//
// What gets written on an improvement:
//   1. model-weights.{epoch:02}-{val_acc:.6}.mpk — all parameters
//   2. best_checkpoint.json                      — pointer to (1)
//   3. train_config.json                         — run configuration
//
// Weights are serialised with Burn's NamedMpkBytesRecorder and
// written with std::fs, so an unwritable directory surfaces as
// PipelineError::Io at the first write. Nothing is created up
// front, and superseded checkpoints are never pruned.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::PipelineError;

const BEST_POINTER: &str = "best_checkpoint.json";
const CONFIG_FILE: &str = "train_config.json";

type WeightsRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

// ─── BestTracker ──────────────────────────────────────────────────────────────
/// Best validation accuracy seen so far in this run.
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    best: Option<f64>,
}

impl BestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value`; true only when it is strictly better than every
    /// earlier value. NaN never counts as an improvement.
    pub fn observe(&mut self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let improved = self.best.map_or(true, |best| value > best);
        if improved {
            self.best = Some(value);
        }
        improved
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }
}

/// Contents of best_checkpoint.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCheckpoint {
    pub file: String,
    pub epoch: usize,
    pub val_accuracy: f64,
}

/// `model-weights.03-0.851234.mpk`
pub fn checkpoint_file_name(epoch: usize, val_accuracy: f64) -> String {
    format!("model-weights.{epoch:02}-{val_accuracy:.6}.mpk")
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
pub struct CheckpointManager {
    dir: PathBuf,
    /// Serialised run config, written next to the first checkpoint
    config_json: Option<String>,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            config_json: None,
        }
    }

    /// Same as `new`, but also persists `cfg` with every saved checkpoint
    /// so the model can be rebuilt later.
    pub fn with_config(dir: impl Into<PathBuf>, cfg: &TrainConfig) -> Result<Self> {
        let json = serde_json::to_string_pretty(cfg).context("Cannot serialise train config")?;
        Ok(Self {
            dir: dir.into(),
            config_json: Some(json),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the weights of `model` for `epoch` and point best_checkpoint.json at them.
    pub fn save_model<B: Backend, M: Module<B>>(
        &self,
        model: &M,
        epoch: usize,
        val_accuracy: f64,
    ) -> Result<SavedCheckpoint, PipelineError> {
        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::io(&self.dir, e))?;

        let file = checkpoint_file_name(epoch, val_accuracy);
        let path = self.dir.join(&file);

        let bytes = Recorder::<B>::record(&WeightsRecorder::default(), model.clone().into_record(), ())
            .map_err(|e| PipelineError::Record {
                path: path.clone(),
                reason: format!("{e:?}"),
            })?;
        fs::write(&path, bytes).map_err(|e| PipelineError::io(&path, e))?;

        let saved = SavedCheckpoint {
            file,
            epoch,
            val_accuracy,
        };
        self.write_json(BEST_POINTER, &saved)?;
        if let Some(json) = &self.config_json {
            let cfg_path = self.dir.join(CONFIG_FILE);
            fs::write(&cfg_path, json).map_err(|e| PipelineError::io(&cfg_path, e))?;
        }

        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(saved)
    }

    /// Load the weights named by best_checkpoint.json into `model`.
    pub fn load_best<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let saved = self.best()?;
        tracing::info!(
            "Loading checkpoint '{}' (epoch {}, val_acc {:.6})",
            saved.file,
            saved.epoch,
            saved.val_accuracy
        );
        Ok(self.load_file(model, &saved.file, device)?)
    }

    /// Load the weights in `file` (relative to the checkpoint directory) into `model`.
    pub fn load_file<B: Backend, M: Module<B>>(
        &self,
        model: M,
        file: &str,
        device: &B::Device,
    ) -> Result<M, PipelineError> {
        let path = self.dir.join(file);
        let bytes = fs::read(&path).map_err(|e| PipelineError::io(&path, e))?;
        let record = Recorder::<B>::load::<M::Record>(&WeightsRecorder::default(), bytes, device)
            .map_err(|e| PipelineError::Record {
                path: path.clone(),
                reason: format!("{e:?}"),
            })?;
        Ok(model.load_record(record))
    }

    /// The checkpoint best_checkpoint.json points at.
    pub fn best(&self) -> Result<SavedCheckpoint> {
        let path = self.dir.join(BEST_POINTER);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read '{}'. Has a training run saved a checkpoint yet?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// The configuration stored by the training run.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), PipelineError> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value).map_err(|e| PipelineError::Record {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| PipelineError::io(&path, e))
    }
}
