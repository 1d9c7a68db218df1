// ============================================================
// Layer 5 — ELMo Embedder
// ============================================================
// Contextual sentence embedding as an ordinary Burn module. The
// embedder owns every one of its parameters, so they are part of
// the enclosing model's record and optimiser state with no extra
// registration step.
//
//   [N, 1] strings
//       │  CharEncoder
//       ▼
//   char ids [N·T, C] → char embedding [N·T, C, 16]
//       │  Conv1d per filter width, max over time, ReLU
//       ▼
//   [N·T, 2048] → highway × 2 → projection [N·T, 512]
//       │
//       ▼
//   layer 0: token reps [N, T, 512] duplicated to [N, T, 1024]
//   layer 1: BiLSTM                      [N, T, 1024]
//   layer 2: BiLSTM + residual           [N, T, 1024]
//            (backward direction reads each sentence's own tokens
//             in reverse; batch padding stays behind them)
//       │  softmax-weighted scalar mix × gamma
//       ▼
//   mean over real word positions → [N, 1024]
//
// Reference: Peters et al. (2018) Deep contextualized word representations
//            Burn Book §3 (Building Blocks)

use burn::{
    module::Param,
    nn::{
        conv::{Conv1d, Conv1dConfig},
        Embedding, EmbeddingConfig, Linear, LinearConfig, Lstm, LstmConfig,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid, softmax},
};

use crate::domain::text_column::TextColumn;
use crate::ml::char_encoder::{CharEncoder, EncodedBatch, CHAR_VOCAB_SIZE, MAX_CHARS_PER_TOKEN};

/// Char-CNN filters of the original 2x4096_512 ELMo: `[width, count]`.
pub const ELMO_FILTERS: [[usize; 2]; 7] = [
    [1, 32],
    [2, 32],
    [3, 64],
    [4, 128],
    [5, 256],
    [6, 512],
    [7, 1024],
];

#[derive(Config, Debug)]
pub struct ElmoEmbedderConfig {
    /// `[width, count]` per char-CNN filter bank
    pub filters: Vec<[usize; 2]>,
    #[config(default = 262)]
    pub char_vocab_size: usize,
    #[config(default = 16)]
    pub char_dim: usize,
    #[config(default = 50)]
    pub max_chars: usize,
    #[config(default = 2)]
    pub n_highway: usize,
    /// Token projection size; each LSTM direction has the same width,
    /// so the output is `2 * projection_dim`
    #[config(default = 512)]
    pub projection_dim: usize,
    #[config(default = 2)]
    pub n_lstm_layers: usize,
    /// When false, gradients stop at the embedder output
    #[config(default = true)]
    pub trainable: bool,
}

impl ElmoEmbedderConfig {
    /// The published ELMo architecture: 1024-dim output.
    pub fn elmo_original() -> Self {
        Self::new(ELMO_FILTERS.to_vec())
            .with_char_vocab_size(CHAR_VOCAB_SIZE)
            .with_max_chars(MAX_CHARS_PER_TOKEN)
    }

    pub fn output_dim(&self) -> usize {
        2 * self.projection_dim
    }

    /// # Panics
    /// Panics if a filter is wider than a token's character window.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ElmoEmbedder<B> {
        for [width, _] in &self.filters {
            assert!(
                *width <= self.max_chars,
                "filter width ({}) must not exceed max_chars ({})",
                width,
                self.max_chars
            );
        }

        let char_embedding = EmbeddingConfig::new(self.char_vocab_size, self.char_dim).init(device);
        let convolutions = self
            .filters
            .iter()
            .map(|[width, count]| Conv1dConfig::new(self.char_dim, *count, *width).init(device))
            .collect();

        let n_filters: usize = self.filters.iter().map(|[_, count]| count).sum();
        let highways = (0..self.n_highway)
            .map(|_| Highway {
                transform: LinearConfig::new(n_filters, n_filters).init(device),
                gate: LinearConfig::new(n_filters, n_filters).init(device),
            })
            .collect();
        let projection = LinearConfig::new(n_filters, self.projection_dim).init(device);

        let d = self.projection_dim;
        let lstm_layers = (0..self.n_lstm_layers)
            .map(|i| {
                let d_input = if i == 0 { d } else { 2 * d };
                BiLstmLayer {
                    forward: LstmConfig::new(d_input, d, true).init(device),
                    backward: LstmConfig::new(d_input, d, true).init(device),
                }
            })
            .collect();

        ElmoEmbedder {
            char_embedding,
            convolutions,
            highways,
            projection,
            lstm_layers,
            mix_weights: Param::from_tensor(Tensor::zeros([self.n_lstm_layers + 1], device)),
            gamma: Param::from_tensor(Tensor::ones([1], device)),
            max_chars: self.max_chars,
            projection_dim: self.projection_dim,
            trainable: self.trainable,
        }
    }
}

// ─── Highway ──────────────────────────────────────────────────────────────────
/// `y = g ⊙ x + (1 − g) ⊙ relu(W_t x)` with `g = σ(W_g x)`
#[derive(Module, Debug)]
pub struct Highway<B: Backend> {
    pub transform: Linear<B>,
    pub gate: Linear<B>,
}

impl<B: Backend> Highway<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let gate = sigmoid(self.gate.forward(x.clone()));
        let transformed = relu(self.transform.forward(x.clone()));
        gate.clone() * x + gate.neg().add_scalar(1.0) * transformed
    }
}

// ─── BiLstmLayer ──────────────────────────────────────────────────────────────
/// Two unidirectional LSTMs, laid out like burn's `BiLstm` record. The
/// backward one reads each row's occupied prefix in reverse, so trailing
/// batch padding never reaches a real token.
#[derive(Module, Debug)]
pub struct BiLstmLayer<B: Backend> {
    pub forward: Lstm<B>,
    pub backward: Lstm<B>,
}

impl<B: Backend> BiLstmLayer<B> {
    /// `x`: `[n, t, d_in]`, `reverse`: per-row prefix reversal over `n·t`
    /// (see `EncodedBatch::reverse_permutation`). Returns `[n, t, 2·d]`.
    pub fn forward(&self, x: Tensor<B, 3>, reverse: Tensor<B, 1, Int>) -> Tensor<B, 3> {
        let (ahead, _) = self.forward.forward(x.clone(), None);
        let (behind, _) = self.backward.forward(reverse_rows(x, reverse.clone()), None);
        Tensor::cat(vec![ahead, reverse_rows(behind, reverse)], 2)
    }
}

fn reverse_rows<B: Backend>(x: Tensor<B, 3>, reverse: Tensor<B, 1, Int>) -> Tensor<B, 3> {
    let [n, t, d] = x.dims();
    x.reshape([n * t, d]).select(0, reverse).reshape([n, t, d])
}

// ─── ElmoEmbedder ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ElmoEmbedder<B: Backend> {
    pub char_embedding: Embedding<B>,
    pub convolutions: Vec<Conv1d<B>>,
    pub highways: Vec<Highway<B>>,
    pub projection: Linear<B>,
    pub lstm_layers: Vec<BiLstmLayer<B>>,
    /// Pre-softmax layer weights of the scalar mix, one per layer
    pub mix_weights: Param<Tensor<B, 1>>,
    pub gamma: Param<Tensor<B, 1>>,
    pub max_chars: usize,
    pub projection_dim: usize,
    pub trainable: bool,
}

impl<B: Backend> ElmoEmbedder<B> {
    pub fn output_dim(&self) -> usize {
        2 * self.projection_dim
    }

    pub fn parameter_count(&self) -> usize {
        self.num_params()
    }

    fn encoder(&self) -> CharEncoder {
        CharEncoder::new(self.max_chars)
    }

    fn device(&self) -> B::Device {
        self.gamma.val().device()
    }

    /// `[N, 1]` strings → `[N, output_dim]` sentence vectors.
    pub fn forward(&self, texts: &TextColumn) -> Tensor<B, 2> {
        let batch = self.encoder().encode_batch(texts.squeeze());
        self.forward_encoded(&batch)
    }

    /// `[N, T]` mask: true for real words, false for `--PAD--`,
    /// sentence markers and batch padding.
    pub fn compute_mask(&self, texts: &TextColumn) -> Tensor<B, 2, Bool> {
        let batch = self.encoder().encode_batch(texts.squeeze());
        Tensor::from_data(
            TensorData::new(batch.word_mask, [batch.batch_size, batch.seq_len]),
            &self.device(),
        )
    }

    pub fn forward_encoded(&self, batch: &EncodedBatch) -> Tensor<B, 2> {
        let device = self.device();
        let (n, t, c) = (batch.batch_size, batch.seq_len, batch.max_chars);
        let d = self.projection_dim;

        if n == 0 {
            return Tensor::zeros([0, self.output_dim()], &device);
        }

        // ── Character CNN ─────────────────────────────────────────────────────
        let ids = Tensor::<B, 2, Int>::from_data(TensorData::new(batch.ids.clone(), [n * t, c]), &device);
        let chars = self.char_embedding.forward(ids).swap_dims(1, 2); // [n·t, char_dim, c]

        let features: Vec<Tensor<B, 2>> = self
            .convolutions
            .iter()
            .map(|conv| {
                let out = conv.forward(chars.clone());
                let [rows, filters, _] = out.dims();
                relu(out.max_dim(2).reshape([rows, filters]))
            })
            .collect();
        let mut x = Tensor::cat(features, 1);

        for highway in &self.highways {
            x = highway.forward(x);
        }

        // ── Contextual layers ─────────────────────────────────────────────────
        let slot_mask = mask_tensor::<B>(&batch.slot_mask, n, t, &device);
        let tokens = self.projection.forward(x).reshape([n, t, d]) * slot_mask.clone();
        let reverse = Tensor::<B, 1, Int>::from_data(
            TensorData::new(batch.reverse_permutation(), [n * t]),
            &device,
        );

        let mut layers = vec![Tensor::cat(vec![tokens.clone(), tokens.clone()], 2)];
        let mut hidden = tokens;
        for (i, lstm) in self.lstm_layers.iter().enumerate() {
            let out = lstm.forward(hidden.clone(), reverse.clone());
            let out = if i == 0 { out } else { out + hidden };
            let out = out * slot_mask.clone();
            layers.push(out.clone());
            hidden = out;
        }

        // ── Scalar mix ────────────────────────────────────────────────────────
        let weights = softmax(self.mix_weights.val(), 0);
        let mixed = layers
            .into_iter()
            .enumerate()
            .map(|(k, layer)| layer * weights.clone().slice([k..k + 1]).reshape([1, 1, 1]))
            .reduce(|acc, layer| acc + layer)
            .map(|m| m * self.gamma.val().reshape([1, 1, 1]));
        let mixed = match mixed {
            Some(m) => m,
            None => return Tensor::zeros([n, self.output_dim()], &device),
        };

        // ── Mean pool over real words ─────────────────────────────────────────
        let word_mask = mask_tensor::<B>(&batch.word_mask, n, t, &device);
        let summed = (mixed * word_mask.clone()).sum_dim(1).reshape([n, 2 * d]);
        let counts = word_mask.sum_dim(1).reshape([n, 1]).clamp_min(1.0);
        let pooled = summed / counts;

        if self.trainable {
            pooled
        } else {
            pooled.detach()
        }
    }
}

/// Row-major bool mask → `[n, t, 1]` float tensor of 0/1.
fn mask_tensor<B: Backend>(mask: &[bool], n: usize, t: usize, device: &B::Device) -> Tensor<B, 3> {
    let values: Vec<f32> = mask.iter().map(|&m| if m { 1.0 } else { 0.0 }).collect();
    Tensor::from_data(TensorData::new(values, [n, t, 1]), device)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_config() -> ElmoEmbedderConfig {
        ElmoEmbedderConfig::new(vec![[1, 4], [2, 4]])
            .with_char_dim(4)
            .with_max_chars(8)
            .with_n_highway(1)
            .with_projection_dim(6)
    }

    fn column(texts: &[&str]) -> TextColumn {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_empty_string_gives_1024_vector() {
        let device = Default::default();
        let embedder: ElmoEmbedder<TestBackend> = ElmoEmbedderConfig::elmo_original().init(&device);
        let out = embedder.forward(&column(&[""]));

        assert_eq!(out.dims(), [1, 1024]);
        let values: Vec<f32> = out.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_output_shape_ignores_text_length() {
        let device = Default::default();
        let embedder: ElmoEmbedder<TestBackend> = tiny_config().init(&device);
        let long = "word ".repeat(40);
        let out = embedder.forward(&column(&["short", long.as_str(), ""]));
        assert_eq!(out.dims(), [3, 12]);
    }

    #[test]
    fn test_pad_token_is_masked() {
        let device = Default::default();
        let embedder: ElmoEmbedder<TestBackend> = tiny_config().init(&device);
        let mask = embedder.compute_mask(&column(&["a --PAD-- b"]));

        assert_eq!(mask.dims(), [1, 5]);
        let values: Vec<bool> = mask.into_data().iter::<bool>().collect();
        assert_eq!(values, vec![false, true, false, true, false]);
    }

    #[test]
    fn test_embedding_does_not_depend_on_batch_mates() {
        let device = Default::default();
        let embedder: ElmoEmbedder<TestBackend> = tiny_config().init(&device);

        let alone = embedder.forward(&column(&["good film"]));
        let batched = embedder.forward(&column(&[
            "good film",
            "one two three four five six seven eight nine ten",
        ]));
        let row: Vec<f32> = batched.slice([0..1, 0..12]).into_data().iter::<f32>().collect();
        let alone: Vec<f32> = alone.into_data().iter::<f32>().collect();

        let max_diff = row
            .iter()
            .zip(&alone)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff < 1e-5, "max_diff = {max_diff}");
    }

    #[test]
    fn test_instances_own_their_parameters() {
        let device = Default::default();
        let a: ElmoEmbedder<TestBackend> = tiny_config().init(&device);
        let b: ElmoEmbedder<TestBackend> = tiny_config().init(&device);
        assert_eq!(a.parameter_count(), b.parameter_count());
        assert!(a.parameter_count() > 0);
        assert_ne!(a.char_embedding.weight.id, b.char_embedding.weight.id);
    }
}
