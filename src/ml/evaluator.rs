// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a trained model on a held-out column:
//
//   TextColumn [N, 1] ──batches──▶ probabilities [N]
//                                    │ p > threshold → "1"
//                                    ▼
//                     ConfusionMatrix → ClassificationReport
//
// Runs on any backend; callers pass `model.valid()` so no
// autodiff graph is recorded.

use std::fmt;

use burn::prelude::*;

use crate::domain::{
    report::{ClassificationReport, ConfusionMatrix},
    sample::Label,
    text_column::TextColumn,
};
use crate::ml::model::ElmoClassifier;

pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub accuracy: f64,
    pub report: ClassificationReport,
    /// One probability per input row, in input order
    pub probabilities: Vec<f32>,
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {:.2}%", self.accuracy * 100.0)?;
        write!(f, "{}", self.report)
    }
}

pub fn evaluate<B: Backend>(
    model: &ElmoClassifier<B>,
    texts: &TextColumn,
    labels: &[Label],
    batch_size: usize,
    threshold: f32,
) -> Evaluation {
    let batch_size = batch_size.max(1);
    let mut probabilities = Vec::with_capacity(texts.len());

    let mut start = 0;
    while start < texts.len() {
        let chunk = texts.slice(start, batch_size);
        let probs = model.forward(&chunk);
        probabilities.extend(probs.into_data().iter::<f32>());
        tracing::debug!("Scored rows {}..{}", start, start + chunk.len());
        start += batch_size;
    }

    let predicted: Vec<Label> = probabilities
        .iter()
        .map(|&p| Label::from_probability(p, threshold))
        .collect();
    let confusion = ConfusionMatrix::from_pairs(labels, &predicted);
    let report = ClassificationReport::from_confusion(&confusion);

    Evaluation {
        accuracy: confusion.accuracy(),
        report,
        probabilities,
    }
}
