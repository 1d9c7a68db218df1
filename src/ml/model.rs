// ============================================================
// Layer 5 — ELMo Classifier
// ============================================================
// Sentence embedder followed by a two-layer dense head:
//
//   texts [N, 1] → ElmoEmbedder → [N, 1024]
//                → Linear(1024, 256) + ReLU
//                → Linear(256, 1) → logits [N, 1]
//
// Training uses binary cross-entropy on the logits; `forward`
// applies the sigmoid for scoring.

use burn::{
    nn::{
        loss::BinaryCrossEntropyLossConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

use crate::domain::text_column::TextColumn;
use crate::ml::embedder::{ElmoEmbedder, ElmoEmbedderConfig};

#[derive(Config, Debug)]
pub struct ElmoClassifierConfig {
    pub embedder: ElmoEmbedderConfig,
    #[config(default = 256)]
    pub hidden_units: usize,
}

impl ElmoClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ElmoClassifier<B> {
        let embedder = self.embedder.init(device);
        let hidden = LinearConfig::new(self.embedder.output_dim(), self.hidden_units).init(device);
        let output = LinearConfig::new(self.hidden_units, 1).init(device);
        ElmoClassifier { embedder, hidden, output }
    }
}

/// Embedder → Dense(hidden, ReLU) → Dense(1, sigmoid)
#[derive(Module, Debug)]
pub struct ElmoClassifier<B: Backend> {
    pub embedder: ElmoEmbedder<B>,
    pub hidden: Linear<B>,
    pub output: Linear<B>,
}

pub struct ClassificationOutput<B: Backend> {
    pub loss: Tensor<B, 1>,
    /// [batch, 1] probabilities
    pub probabilities: Tensor<B, 2>,
}

impl<B: Backend> ElmoClassifier<B> {
    /// texts: [batch, 1] → logits: [batch, 1]
    pub fn forward_logits(&self, texts: &TextColumn) -> Tensor<B, 2> {
        let embedded = self.embedder.forward(texts);
        let hidden = relu(self.hidden.forward(embedded));
        self.output.forward(hidden)
    }

    /// texts: [batch, 1] → probabilities in [0, 1]: [batch, 1]
    pub fn forward(&self, texts: &TextColumn) -> Tensor<B, 2> {
        sigmoid(self.forward_logits(texts))
    }

    /// Binary cross-entropy against 0/1 targets of shape [batch, 1].
    pub fn forward_classification(
        &self,
        texts:   &TextColumn,
        targets: Tensor<B, 2, Int>,
    ) -> ClassificationOutput<B> {
        let logits = self.forward_logits(texts);
        let loss = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&logits.device())
            .forward(logits.clone(), targets);
        ClassificationOutput {
            loss,
            probabilities: sigmoid(logits),
        }
    }

    /// One line per component, logged once when the model is assembled.
    pub fn summary(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("elmo_embedding", self.embedder.parameter_count()),
            ("dense_hidden", self.hidden.num_params()),
            ("dense_output", self.output.num_params()),
        ]
    }
}

/// Number of predictions equal to the targets, thresholding probabilities at 0.5.
pub fn count_correct<B: Backend>(probabilities: Tensor<B, 2>, targets: Tensor<B, 2, Int>) -> usize {
    probabilities
        .greater_elem(0.5)
        .int()
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_config() -> ElmoClassifierConfig {
        ElmoClassifierConfig::new(
            ElmoEmbedderConfig::new(vec![[1, 4], [2, 4]])
                .with_char_dim(4)
                .with_max_chars(8)
                .with_n_highway(1)
                .with_projection_dim(6),
        )
        .with_hidden_units(5)
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let device = Default::default();
        let model: ElmoClassifier<TestBackend> = tiny_config().init(&device);

        for n in [1usize, 4] {
            let texts = (0..n).map(|i| "token ".repeat(i + 1)).collect::<TextColumn>();
            let probs = model.forward(&texts);
            assert_eq!(probs.dims(), [n, 1]);
            let values: Vec<f32> = probs.into_data().iter::<f32>().collect();
            assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_loss_is_finite_scalar() {
        let device = Default::default();
        let model: ElmoClassifier<TestBackend> = tiny_config().init(&device);
        let texts: TextColumn = vec!["good".to_string(), "bad".to_string()].into_iter().collect();
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 0], &device).reshape([2, 1]);

        let out = model.forward_classification(&texts, targets);
        let loss = out.loss.into_scalar().elem::<f32>();
        assert!(loss.is_finite() && loss >= 0.0);
        assert_eq!(out.probabilities.dims(), [2, 1]);
    }

    #[test]
    fn test_count_correct_thresholds_at_half() {
        let device = Default::default();
        let probs = Tensor::<TestBackend, 1>::from_floats([0.9, 0.2, 0.5, 0.51], &device).reshape([4, 1]);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 0, 1], &device).reshape([4, 1]);
        assert_eq!(count_correct(probs, targets), 3);
    }

    #[test]
    fn test_summary_counts_every_component() {
        let device = Default::default();
        let model: ElmoClassifier<TestBackend> = tiny_config().init(&device);
        let summary = model.summary();
        // 12 → 5 dense layer with bias, then 5 → 1
        assert_eq!(summary[1], ("dense_hidden", 12 * 5 + 5));
        assert_eq!(summary[2], ("dense_output", 5 + 1));
        let total: usize = summary.iter().map(|(_, n)| n).sum();
        assert_eq!(total, model.num_params());
    }
}
