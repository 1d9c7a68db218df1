// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples with a seeded RNG and carves a validation set
// off the front of the permutation:
//
//   n_val   = ceil(n * val_fraction)
//   val     = permutation[..n_val]
//   train   = permutation[n_val..]
//
// The same seed and fraction over the same input always yield the
// same row membership in both halves.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Seed used for the train/validation partition.
pub const SPLIT_SEED: u64 = 42;

/// Fraction of the training file held out for validation.
pub const VAL_FRACTION: f64 = 0.1;

/// Shuffle `samples` deterministically and split into (train, validation).
///
/// # Arguments
/// * `samples`      - All available samples (consumed by this function)
/// * `val_fraction` - Proportion for validation, e.g. 0.1 = 10%
/// * `seed`         - RNG seed for the shuffle
pub fn split_train_val<T>(mut samples: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let n_val = ((total as f64) * val_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let n_val = n_val.min(total);

    // split_off(n) leaves [0..n) in place and returns [n..)
    let train = samples.split_off(n_val);
    let val = samples;

    tracing::debug!(
        "Dataset split (seed {}): {} training, {} validation",
        seed,
        train.len(),
        val.len(),
    );

    (train, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..1000).collect();
        let (train, val) = split_train_val(items, 0.1, SPLIT_SEED);
        assert_eq!(train.len(), 900);
        assert_eq!(val.len(), 100);
    }

    #[test]
    fn test_validation_size_rounds_up() {
        let items: Vec<usize> = (0..7).collect();
        let (train, val) = split_train_val(items, 0.1, SPLIT_SEED);
        assert_eq!(val.len(), 1);
        assert_eq!(train.len(), 6);
    }

    #[test]
    fn test_same_seed_same_membership() {
        let (train_a, val_a) = split_train_val((0..500).collect::<Vec<usize>>(), 0.1, 42);
        let (train_b, val_b) = split_train_val((0..500).collect::<Vec<usize>>(), 0.1, 42);
        assert_eq!(train_a, train_b);
        assert_eq!(val_a, val_b);
    }

    #[test]
    fn test_different_seed_changes_membership() {
        let (_, val_a) = split_train_val((0..500).collect::<Vec<usize>>(), 0.1, 42);
        let (_, val_b) = split_train_val((0..500).collect::<Vec<usize>>(), 0.1, 7);
        assert_ne!(val_a, val_b);
    }

    #[test]
    fn test_disjoint_and_complete() {
        let (train, val) = split_train_val((0..250).collect::<Vec<usize>>(), 0.1, SPLIT_SEED);
        let train_set: HashSet<usize> = train.iter().copied().collect();
        let val_set: HashSet<usize> = val.iter().copied().collect();

        assert!(train_set.is_disjoint(&val_set));
        let union: HashSet<usize> = train_set.union(&val_set).copied().collect();
        assert_eq!(union, (0..250).collect::<HashSet<usize>>());
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_train_val(Vec::<usize>::new(), 0.1, SPLIT_SEED);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}
