// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full pipeline in order:
//
//   Step 1: Configure the compute device (Layer 6 - infra)
//   Step 2: Load and split the CSV files (Layer 4 - data)
//   Step 3: Truncate texts to 250 tokens (Layer 4 - data)
//   Step 4: Assemble the classifier      (Layer 5 - ml)
//   Step 5: Load pretrained ELMo weights (Layer 6 - infra)
//   Step 6: Run the training loop        (Layer 5 - ml)
//   Step 7: Score the test split         (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::{
    backend::{Autodiff, Wgpu},
    module::AutodiffModule,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::SampleDataset,
    loader::load_data,
    preprocessor::{Preprocessor, MAX_TOKENS},
    splitter::{SPLIT_SEED, VAL_FRACTION},
};
use crate::infra::{
    checkpoint::{CheckpointManager, SavedCheckpoint},
    environment::EnvironmentConfig,
    metrics::{EpochMetrics, MetricsLogger},
    module_store::{ModuleReference, ModuleStore},
};
use crate::ml::{
    embedder::ElmoEmbedderConfig,
    evaluator::{evaluate, Evaluation, DECISION_THRESHOLD},
    model::{ElmoClassifier, ElmoClassifierConfig},
    trainer::run_training,
};

type TrainBackend = Autodiff<Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a run. Persisted as train_config.json next to the
// checkpoints so `evaluate` can rebuild the exact same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_path:       String,
    pub test_path:        String,
    pub model_dir:        String,
    pub max_tokens:       usize,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub learning_rate:    f64,
    pub val_fraction:     f64,
    pub split_seed:       u64,
    pub hidden_units:     usize,
    /// Pretrained module URL or path; falls back to ELMO_MODULE_URL
    pub module:           Option<String>,
    pub module_cache_dir: Option<String>,
    pub device_index:     usize,
    pub memory_fraction:  f64,
    pub embedder:         ElmoEmbedderConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let env = EnvironmentConfig::default();
        Self {
            train_path:       "Data/binary_train_data.csv".to_string(),
            test_path:        "Data/binary_test_data.csv".to_string(),
            model_dir:        "Model".to_string(),
            max_tokens:       MAX_TOKENS,
            epochs:           3,
            batch_size:       128,
            learning_rate:    1e-3,
            val_fraction:     VAL_FRACTION,
            split_seed:       SPLIT_SEED,
            hidden_units:     256,
            module:           None,
            module_cache_dir: None,
            device_index:     env.device_index,
            memory_fraction:  env.memory_fraction,
            embedder:         ElmoEmbedderConfig::elmo_original(),
        }
    }
}

impl TrainConfig {
    pub fn environment(&self) -> EnvironmentConfig {
        EnvironmentConfig {
            device_index: self.device_index,
            memory_fraction: self.memory_fraction,
        }
    }

    pub fn model_config(&self) -> ElmoClassifierConfig {
        ElmoClassifierConfig::new(self.embedder.clone()).with_hidden_units(self.hidden_units)
    }
}

/// Everything a finished run produced.
pub struct TrainReport {
    pub history: Vec<EpochMetrics>,
    pub best: Option<SavedCheckpoint>,
    pub evaluation: Evaluation,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run on the configured WGPU device.
    pub fn execute(&self) -> Result<TrainReport> {
        // ── Step 1: Configure the compute environment ─────────────────────────
        let env = self.config.environment().apply()?;
        self.execute_on::<TrainBackend>(env.device())
    }

    /// Run steps 2–7 on any autodiff backend.
    pub fn execute_on<B: AutodiffBackend>(&self, device: &B::Device) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 2: Load CSVs and carve off validation ────────────────────────
        tracing::info!("Loading '{}' and '{}'", cfg.train_path, cfg.test_path);
        let splits = load_data(&cfg.train_path, &cfg.test_path, cfg.val_fraction, cfg.split_seed)
            .context("Failed to load input data")?;
        tracing::info!(
            "Split: {} train, {} validation, {} test",
            splits.train.len(),
            splits.validation.len(),
            splits.test.len()
        );

        // ── Step 3: Truncate every text ───────────────────────────────────────
        let preprocessor = Preprocessor::new(cfg.max_tokens);
        let (test_texts, test_labels) = splits.test_xy();
        let test_column = preprocessor.to_column(&test_texts);
        let train = preprocessor.apply(splits.train);
        let validation = preprocessor.apply(splits.validation);

        // ── Step 4 + 5: Assemble model with pretrained embedder ───────────────
        let mut model: ElmoClassifier<B> = cfg.model_config().init(device);
        let reference = ModuleReference::resolve(cfg.module.as_deref())?;
        let store = ModuleStore::new(cfg.module_cache_dir.as_ref().map(PathBuf::from));
        model.embedder = store.load_embedder(&reference, model.embedder, device)?;
        log_summary(&model);

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let checkpoints = CheckpointManager::with_config(&cfg.model_dir, cfg)?;
        let metrics = MetricsLogger::new(&cfg.model_dir);
        let outcome = run_training(
            cfg,
            model,
            SampleDataset::new(train),
            SampleDataset::new(validation),
            &checkpoints,
            &metrics,
            device,
        )?;

        // ── Step 7: Evaluate the final-epoch model ────────────────────────────
        let evaluation = evaluate(
            &outcome.model.valid(),
            &test_column,
            &test_labels,
            cfg.batch_size,
            DECISION_THRESHOLD,
        );
        tracing::info!("Test accuracy: {:.4}", evaluation.accuracy);

        Ok(TrainReport {
            history: outcome.history,
            best: outcome.best,
            evaluation,
        })
    }
}

fn log_summary<B: Backend>(model: &ElmoClassifier<B>) {
    let summary = model.summary();
    for (name, params) in &summary {
        tracing::info!("  {:<16} {:>12} params", name, params);
    }
    let total: usize = summary.iter().map(|(_, n)| n).sum();
    tracing::info!("  {:<16} {:>12} params", "total", total);
}
