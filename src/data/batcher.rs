// ============================================================
// Layer 4 — Text Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<Sample> into a
// TextBatch:
//
//   texts  : TextColumn          [N, 1] strings for the embedder
//   labels : Tensor<B, 2, Int>   [N, 1] 0/1 targets
//
// Character encoding of the strings happens inside the embedder,
// so the batcher only needs to stack labels on the device.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::{sample::Sample, text_column::TextColumn};

// ─── TextBatch ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TextBatch<B: Backend> {
    /// One string per row
    pub texts: TextColumn,

    /// Ground truth — shape: [batch_size, 1]
    pub labels: Tensor<B, 2, Int>,
}

// ─── TextBatcher ──────────────────────────────────────────────────────────────
/// Holds the target device so label tensors land on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct TextBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TextBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<Sample, TextBatch<B>> for TextBatcher<B> {
    fn batch(&self, items: Vec<Sample>) -> TextBatch<B> {
        let batch_size = items.len();

        let labels: Vec<i32> = items.iter().map(|s| s.label.index() as i32).collect();
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        let texts = items.into_iter().map(|s| s.text).collect();

        TextBatch { texts, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::Label;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes() {
        let batcher = TextBatcher::<NdArray>::new(Default::default());
        let batch = batcher.batch(vec![
            Sample::new(0, "good film", Label::Positive),
            Sample::new(1, "", Label::Negative),
            Sample::new(2, "bad film", Label::Negative),
        ]);

        assert_eq!(batch.texts.shape(), [3, 1]);
        assert_eq!(batch.labels.dims(), [3, 1]);
        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![1, 0, 0]);
    }
}
