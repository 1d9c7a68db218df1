// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Re-scores the test split with the best checkpoint of an
// earlier run:
//
//   Step 1: Read train_config.json       (Layer 6 - infra)
//   Step 2: Configure the compute device (Layer 6 - infra)
//   Step 3: Rebuild model, load weights  (Layer 5 + 6)
//   Step 4: Load and truncate test CSV   (Layer 4 - data)
//   Step 5: Score                        (Layer 5 - ml)
//
// The checkpoint already holds the fine-tuned embedder, so no
// pretrained module is fetched here.

use anyhow::{Context, Result};
use burn::{backend::Wgpu, prelude::*};

use crate::application::train_use_case::TrainConfig;
use crate::data::{loader::CsvLoader, preprocessor::Preprocessor};
use crate::domain::{sample::Label, traits::SampleSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    evaluator::{evaluate, Evaluation, DECISION_THRESHOLD},
    model::ElmoClassifier,
};

pub struct EvaluateUseCase {
    checkpoints: CheckpointManager,
    /// Overrides the test file recorded in the run config
    test_path: Option<String>,
}

impl EvaluateUseCase {
    pub fn new(model_dir: impl Into<std::path::PathBuf>, test_path: Option<String>) -> Self {
        Self {
            checkpoints: CheckpointManager::new(model_dir),
            test_path,
        }
    }

    pub fn execute(&self) -> Result<Evaluation> {
        let cfg = self.checkpoints.load_config()?;
        let env = cfg.environment().apply()?;
        self.execute_with::<Wgpu>(&cfg, env.device())
    }

    /// Same as `execute`, on any backend.
    pub fn execute_on<B: Backend>(&self, device: &B::Device) -> Result<Evaluation> {
        let cfg = self.checkpoints.load_config()?;
        self.execute_with::<B>(&cfg, device)
    }

    fn execute_with<B: Backend>(&self, cfg: &TrainConfig, device: &B::Device) -> Result<Evaluation> {
        let model: ElmoClassifier<B> = cfg.model_config().init(device);
        let model = self.checkpoints.load_best::<B, _>(model, device)?;

        let test_path = self.test_path.as_deref().unwrap_or(&cfg.test_path);
        tracing::info!("Scoring '{}'", test_path);
        let samples = CsvLoader::new(test_path)
            .load_all()
            .with_context(|| format!("Failed to load test data from '{test_path}'"))?;

        let preprocessor = Preprocessor::new(cfg.max_tokens);
        let column = preprocessor.to_column(&samples.iter().map(|s| s.text.as_str()).collect::<Vec<_>>());
        let labels: Vec<Label> = samples.iter().map(|s| s.label).collect();

        Ok(evaluate(&model, &column, &labels, cfg.batch_size, DECISION_THRESHOLD))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::embedder::ElmoEmbedderConfig;
    use burn::backend::NdArray;
    use std::fs;

    type TestBackend = NdArray;

    fn tiny_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            test_path: dir.join("test.csv").display().to_string(),
            model_dir: dir.join("Model").display().to_string(),
            hidden_units: 3,
            embedder: ElmoEmbedderConfig::new(vec![[1, 3]])
                .with_char_dim(3)
                .with_max_chars(6)
                .with_n_highway(1)
                .with_projection_dim(3)
                .with_n_lstm_layers(1),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_scores_with_saved_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        fs::write(&cfg.test_path, "text,label\ngood,1\nbad,0\nfine,1\n").unwrap();

        let model: ElmoClassifier<TestBackend> = cfg.model_config().init(&Default::default());
        let manager = CheckpointManager::with_config(&cfg.model_dir, &cfg).unwrap();
        manager.save_model::<TestBackend, _>(&model, 1, 0.5).unwrap();

        let evaluation = EvaluateUseCase::new(&cfg.model_dir, None)
            .execute_on::<TestBackend>(&Default::default())
            .unwrap();
        assert_eq!(evaluation.report.total_support(), 3);
        assert_eq!(evaluation.probabilities.len(), 3);
    }

    #[test]
    fn test_missing_run_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = EvaluateUseCase::new(dir.path().join("Model"), None)
            .execute_on::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("train_config.json"));
    }
}
