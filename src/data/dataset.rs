use burn::data::dataset::Dataset;

use crate::domain::sample::Sample;

/// In-memory split exposed through Burn's `Dataset` trait so a
/// `DataLoader` can call `.get(index)` and `.len()` on it.
pub struct SampleDataset {
    samples: Vec<Sample>,
}

impl SampleDataset {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

impl Dataset<Sample> for SampleDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
