//! Epoch ordering and batch materialization.

use std::sync::Arc;

use burn::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{NeuralTerraError, Result};

use super::batch::TerrainBatch;
use super::dataset::TerrainDataset;

/// Restartable batch source over a dataset.
///
/// Shuffling loaders draw a fresh permutation from a seeded RNG at the start
/// of every epoch; fixed loaders always yield the dataset order.
pub struct BatchLoader {
    dataset: Arc<dyn TerrainDataset>,
    batch_size: usize,
    rng: Option<StdRng>,
}

impl BatchLoader {
    /// Loader that reshuffles every epoch.
    pub fn shuffled(dataset: Arc<dyn TerrainDataset>, batch_size: usize, seed: u64) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            rng: Some(StdRng::seed_from_u64(seed)),
        }
    }

    /// Loader with a fixed order.
    pub fn sequential(dataset: Arc<dyn TerrainDataset>, batch_size: usize) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            rng: None,
        }
    }

    /// Underlying dataset.
    pub fn dataset(&self) -> &Arc<dyn TerrainDataset> {
        &self.dataset
    }

    /// Batches per epoch; the last one may be partial.
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Sample indices of each batch for the next epoch.
    pub fn epoch_order(&mut self) -> Vec<Vec<usize>> {
        let mut ids: Vec<usize> = (0..self.dataset.len()).collect();
        if let Some(rng) = self.rng.as_mut() {
            ids.shuffle(rng);
        }
        ids.chunks(self.batch_size).map(<[usize]>::to_vec).collect()
    }

    /// Load and collate the given samples.
    pub fn load<B: Backend>(&self, indices: &[usize], device: &B::Device) -> Result<TerrainBatch<B>> {
        let samples = indices
            .iter()
            .map(|&i| {
                self.dataset.get(i).ok_or_else(|| {
                    NeuralTerraError::InvalidData(format!("sample {} out of range", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        TerrainBatch::collate(&samples, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::InMemoryDataset;

    fn empty_dataset(n: usize) -> Arc<dyn TerrainDataset> {
        struct Counting(usize);
        impl TerrainDataset for Counting {
            fn len(&self) -> usize {
                self.0
            }
            fn get(&self, _index: usize) -> Option<crate::data::TerrainSample> {
                None
            }
        }
        Arc::new(Counting(n))
    }

    #[test]
    fn test_sequential_order() {
        let mut loader = BatchLoader::sequential(empty_dataset(5), 2);
        assert_eq!(loader.num_batches(), 3);
        assert_eq!(loader.epoch_order(), vec![vec![0, 1], vec![2, 3], vec![4]]);
        assert_eq!(loader.epoch_order(), vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn test_shuffled_is_permutation() {
        let mut loader = BatchLoader::shuffled(empty_dataset(20), 3, 42);
        let mut flat: Vec<usize> = loader.epoch_order().into_iter().flatten().collect();
        flat.sort_unstable();
        assert_eq!(flat, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_reproducible() {
        let mut a = BatchLoader::shuffled(empty_dataset(20), 4, 9);
        let mut b = BatchLoader::shuffled(empty_dataset(20), 4, 9);
        assert_eq!(a.epoch_order(), b.epoch_order());
        assert_eq!(a.epoch_order(), b.epoch_order());
    }

    #[test]
    fn test_missing_sample() {
        let loader = BatchLoader::sequential(Arc::new(InMemoryDataset::default()), 1);
        let device = Default::default();
        assert!(loader
            .load::<burn::backend::NdArray>(&[0], &device)
            .is_err());
    }
}
