// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Explicit epoch loop using Burn's DataLoader and Adam:
//
//   for epoch in 1..=E
//       train    : forward → BCE → backward → Adam step, per batch
//       validate : model.valid() on the inner backend, no autodiff
//       report   : one stdout line + one metrics.csv row
//       save     : only when val_acc beats every earlier epoch
//
// The model is generic over any AutodiffBackend so the same loop
// runs on Autodiff<Wgpu> in production and Autodiff<NdArray> in
// tests. Batch order is shuffled with a seed drawn once per run.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TextBatcher, dataset::SampleDataset};
use crate::infra::{
    checkpoint::{BestTracker, CheckpointManager, SavedCheckpoint},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{count_correct, ElmoClassifier};

/// What a finished run hands back to the caller.
pub struct TrainingOutcome<B: AutodiffBackend> {
    /// Weights after the final epoch
    pub model: ElmoClassifier<B>,
    pub history: Vec<EpochMetrics>,
    /// Last checkpoint written, if any epoch improved
    pub best: Option<SavedCheckpoint>,
}

/// Running sums for one pass over a loader.
#[derive(Default)]
struct Totals {
    loss_sum: f64,
    correct: usize,
    seen: usize,
}

impl Totals {
    fn add(&mut self, batch_loss: f64, correct: usize, batch_size: usize) {
        // Sample-weighted, so a short final batch counts proportionally
        self.loss_sum += batch_loss * batch_size as f64;
        self.correct += correct;
        self.seen += batch_size;
    }

    fn loss(&self) -> f64 {
        if self.seen == 0 {
            f64::NAN
        } else {
            self.loss_sum / self.seen as f64
        }
    }

    fn accuracy(&self) -> f64 {
        if self.seen == 0 {
            0.0
        } else {
            self.correct as f64 / self.seen as f64
        }
    }
}

pub fn run_training<B: AutodiffBackend>(
    cfg:         &TrainConfig,
    mut model:   ElmoClassifier<B>,
    train:       SampleDataset,
    val:         SampleDataset,
    checkpoints: &CheckpointManager,
    metrics:     &MetricsLogger,
    device:      &B::Device,
) -> Result<TrainingOutcome<B>> {
    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_epsilon(1e-7)
        .init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let shuffle_seed: u64 = rand::random();
    tracing::info!("Training batch shuffle seed: {}", shuffle_seed);

    let train_loader = DataLoaderBuilder::new(TextBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(shuffle_seed)
        .num_workers(1)
        .build(train);

    let val_loader = DataLoaderBuilder::new(TextBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val);

    let mut tracker = BestTracker::new();
    let mut history = Vec::with_capacity(cfg.epochs);
    let mut best = None;

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_totals = Totals::default();
        for batch in train_loader.iter() {
            let batch_size = batch.texts.len();
            let output = model.forward_classification(&batch.texts, batch.labels.clone());

            let loss_val: f64 = output.loss.clone().into_scalar().elem::<f64>();
            let correct = count_correct(output.probabilities.detach(), batch.labels);
            train_totals.add(loss_val, correct, batch_size);

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut val_totals = Totals::default();
        for batch in val_loader.iter() {
            let batch_size = batch.texts.len();
            let output = model_valid.forward_classification(&batch.texts, batch.labels.clone());
            let loss_val: f64 = output.loss.into_scalar().elem::<f64>();
            let correct = count_correct(output.probabilities, batch.labels);
            val_totals.add(loss_val, correct, batch_size);
        }

        let record = EpochMetrics::new(
            epoch,
            train_totals.loss(),
            train_totals.accuracy(),
            val_totals.loss(),
            val_totals.accuracy(),
        );

        println!(
            "Epoch {}/{} | loss={:.4} | acc={:.4} | val_loss={:.4} | val_acc={:.4}",
            epoch, cfg.epochs, record.train_loss, record.train_acc, record.val_loss, record.val_acc,
        );

        // ── Checkpoint on strict improvement ──────────────────────────────────
        let previous = tracker.best();
        if tracker.observe(record.val_acc) {
            let saved = checkpoints.save_model::<B, _>(&model, epoch, record.val_acc)?;
            tracing::info!(
                "Epoch {}: val_acc improved from {} to {:.5}, saved '{}'",
                epoch,
                previous.map_or_else(|| "-inf".to_string(), |p| format!("{p:.5}")),
                record.val_acc,
                checkpoints.dir().join(&saved.file).display()
            );
            best = Some(saved);
        } else {
            tracing::info!(
                "Epoch {}: val_acc did not improve from {:.5}",
                epoch,
                previous.unwrap_or(f64::NAN)
            );
        }

        metrics.log(&record)?;
        history.push(record);
    }

    tracing::info!("Training complete after {} epochs", cfg.epochs);
    Ok(TrainingOutcome { model, history, best })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::{Label, Sample};
    use crate::ml::embedder::ElmoEmbedderConfig;
    use crate::ml::model::ElmoClassifierConfig;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn tiny_model() -> ElmoClassifier<TestBackend> {
        ElmoClassifierConfig::new(
            ElmoEmbedderConfig::new(vec![[1, 4], [2, 4]])
                .with_char_dim(4)
                .with_max_chars(8)
                .with_n_highway(1)
                .with_projection_dim(4)
                .with_n_lstm_layers(1),
        )
        .with_hidden_units(4)
        .init(&Default::default())
    }

    fn samples(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Sample::new(i, "great fun film", Label::Positive)
                } else {
                    Sample::new(i, "dull boring mess", Label::Negative)
                }
            })
            .collect()
    }

    #[test]
    fn test_runs_every_epoch_and_saves_first() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("Model");
        let cfg = TrainConfig {
            epochs: 2,
            batch_size: 4,
            ..TrainConfig::default()
        };
        let checkpoints = CheckpointManager::new(&model_dir);
        let metrics = MetricsLogger::new(&model_dir);

        let outcome = run_training(
            &cfg,
            tiny_model(),
            SampleDataset::new(samples(10)),
            SampleDataset::new(samples(4)),
            &checkpoints,
            &metrics,
            &Default::default(),
        )
        .unwrap();

        assert_eq!(outcome.history.len(), 2);
        for m in &outcome.history {
            assert!(m.train_loss.is_finite());
            assert!((0.0..=1.0).contains(&m.train_acc));
            assert!((0.0..=1.0).contains(&m.val_acc));
        }

        // The first epoch always improves on "nothing yet"
        let first_epoch_saved = std::fs::read_dir(&model_dir)
            .unwrap()
            .any(|e| e.unwrap().file_name().to_string_lossy().starts_with("model-weights.01-"));
        assert!(first_epoch_saved);
        let best = checkpoints.best().unwrap();
        assert!(model_dir.join(&best.file).exists());
        assert_eq!(outcome.best.unwrap(), best);

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_totals_weight_by_batch_size() {
        let mut totals = Totals::default();
        totals.add(1.0, 3, 4);
        totals.add(0.0, 0, 1);
        assert!((totals.loss() - 0.8).abs() < 1e-12);
        assert!((totals.accuracy() - 0.6).abs() < 1e-12);
        assert!(Totals::default().loss().is_nan());
        assert_eq!(Totals::default().accuracy(), 0.0);
    }
}
