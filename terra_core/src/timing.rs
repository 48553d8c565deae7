//! Timestamp matching between simulated and recorded trajectories.

#[cfg(any(feature = "std", feature = "alloc"))]
use crate::alloc_prelude::Vec;
#[cfg(any(feature = "std", feature = "alloc"))]
use crate::error::TerraCoreError;

/// For each query timestamp, index of the closest reference timestamp.
///
/// `reference` must be sorted ascending. Ties resolve to the earlier sample.
#[cfg(any(feature = "std", feature = "alloc"))]
pub fn nearest_indices(reference: &[f32], queries: &[f32]) -> Result<Vec<usize>, TerraCoreError> {
    if reference.is_empty() {
        return Err(TerraCoreError::EmptySequence);
    }
    Ok(queries
        .iter()
        .map(|&t| {
            let upper = reference.partition_point(|&r| r < t);
            if upper == 0 {
                0
            } else if upper == reference.len() {
                reference.len() - 1
            } else {
                let below = upper - 1;
                if t - reference[below] <= reference[upper] - t {
                    below
                } else {
                    upper
                }
            }
        })
        .collect())
}

/// Number of leading timestamps within `horizon` seconds of the first one.
pub fn truncate_horizon(timestamps: &[f32], horizon: f32) -> usize {
    match timestamps.first() {
        Some(&t0) => timestamps
            .iter()
            .take_while(|&&t| t - t0 <= horizon + 1e-6)
            .count(),
        None => 0,
    }
}
