//! Dataset abstraction and seeded train/val splitting.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::sample::TerrainSample;

/// Number of samples used for both splits in debug mode.
pub const DEBUG_SUBSET_SIZE: usize = 16;

/// Random-access source of training samples.
///
/// Implementations must be finite and return the same sample for the same
/// index on every call.
pub trait TerrainDataset: Send + Sync {
    /// Number of samples.
    fn len(&self) -> usize;

    /// Sample at `index`, or `None` when out of range.
    fn get(&self, index: usize) -> Option<TerrainSample>;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dataset held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    samples: Vec<TerrainSample>,
}

impl InMemoryDataset {
    /// Wrap samples.
    pub fn new(samples: Vec<TerrainSample>) -> Self {
        Self { samples }
    }
}

impl TerrainDataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Option<TerrainSample> {
        self.samples.get(index).cloned()
    }
}

/// View over selected indices of another dataset.
#[derive(Clone)]
pub struct SubsetDataset {
    inner: Arc<dyn TerrainDataset>,
    indices: Vec<usize>,
}

impl SubsetDataset {
    /// Select `indices` of `inner`.
    pub fn new(inner: Arc<dyn TerrainDataset>, indices: Vec<usize>) -> Self {
        Self { inner, indices }
    }

    /// Selected indices into the wrapped dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl TerrainDataset for SubsetDataset {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Option<TerrainSample> {
        self.indices.get(index).and_then(|&i| self.inner.get(i))
    }
}

/// Split `0..len` into `(train, val)` index sets.
///
/// `floor(val_fraction * len)` indices are drawn for validation with an RNG
/// seeded by `seed`; training gets the rest. Both lists are sorted.
pub fn split_indices(len: usize, val_fraction: f32, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let n_val = ((val_fraction.clamp(0.0, 1.0) * len as f32) as usize).min(len);
    let mut ids: Vec<usize> = (0..len).collect();
    ids.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut val = ids[..n_val].to_vec();
    let mut train = ids[n_val..].to_vec();
    val.sort_unstable();
    train.sort_unstable();
    (train, val)
}

/// Small fixed subset used for both splits in debug mode.
pub fn debug_indices(len: usize, seed: u64) -> Vec<usize> {
    let mut ids: Vec<usize> = (0..len).collect();
    ids.shuffle(&mut StdRng::seed_from_u64(seed));
    ids.truncate(DEBUG_SUBSET_SIZE);
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_partitions() {
        let (train, val) = split_indices(100, 0.1, 42);
        assert_eq!(val.len(), 10);
        assert_eq!(train.len(), 90);
        let mut all: Vec<usize> = train.iter().chain(val.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(split_indices(50, 0.2, 7), split_indices(50, 0.2, 7));
        assert_ne!(split_indices(50, 0.2, 7).1, split_indices(50, 0.2, 8).1);
    }

    #[test]
    fn test_split_small() {
        let (train, val) = split_indices(2, 0.1, 42);
        assert_eq!(train, vec![0, 1]);
        assert!(val.is_empty());
    }

    #[test]
    fn test_debug_indices() {
        assert_eq!(debug_indices(100, 1).len(), DEBUG_SUBSET_SIZE);
        assert_eq!(debug_indices(5, 1), vec![0, 1, 2, 3, 4]);
    }
}
