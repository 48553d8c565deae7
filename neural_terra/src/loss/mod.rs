//! Loss terms and their weighted aggregation.

mod aggregator;
mod height;
mod trajectory;

pub use aggregator::{LossAggregator, LossBundle, LossScalars};
pub use height::{height_map_loss, masked_mse};
pub use trajectory::{resample_trajectory, trajectory_loss};
