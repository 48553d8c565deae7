use burn::prelude::*;
use terra_core::nearest_indices;

use crate::config::LossConfig;
use crate::data::TrajectoryBatch;
use crate::error::{NeuralTerraError, Result};
use crate::physics::StateTrajectory;
use crate::util::{index_tensor, to_vec};

/// Ground-truth states nearest in time to each predicted timestamp.
pub fn resample_trajectory<B: Backend>(
    truth: &TrajectoryBatch<B>,
    timestamps: Tensor<B, 2>,
) -> Result<TrajectoryBatch<B>> {
    let [batch, steps] = timestamps.dims();
    let [tb, truth_steps] = truth.timestamps.dims();
    if tb != batch {
        return Err(NeuralTerraError::ShapeMismatch {
            expected: vec![batch, truth_steps],
            got: vec![tb, truth_steps],
        });
    }
    let device = timestamps.device();
    let reference = to_vec(truth.timestamps.clone())?;
    let queries = to_vec(timestamps.clone())?;

    let mut indices = Vec::with_capacity(batch * steps);
    for b in 0..batch {
        let row = nearest_indices(
            &reference[b * truth_steps..(b + 1) * truth_steps],
            &queries[b * steps..(b + 1) * steps],
        )?;
        indices.extend(row.into_iter().map(|i| i as i64));
    }
    let index = index_tensor::<B, 2>(indices, [batch, steps], &device);

    let pick3 = |t: &Tensor<B, 3>| {
        let idx = index.clone().unsqueeze_dim::<3>(2).repeat_dim(2, 3);
        t.clone().gather(1, idx)
    };
    let rotations = truth.orientations.clone().reshape([batch, truth_steps, 9]);
    let idx9 = index.clone().unsqueeze_dim::<3>(2).repeat_dim(2, 9);

    Ok(TrajectoryBatch {
        timestamps,
        positions: pick3(&truth.positions),
        linear_velocities: pick3(&truth.linear_velocities),
        orientations: rotations.gather(1, idx9).reshape([batch, steps, 3, 3]),
        angular_velocities: pick3(&truth.angular_velocities),
    })
}

fn mse<B: Backend, const D: usize>(a: Tensor<B, D>, b: Tensor<B, D>) -> Tensor<B, 1> {
    let diff = a - b;
    (diff.clone() * diff).mean()
}

/// Weighted divergence between a rollout and the ground-truth trajectory.
///
/// Zero when the rollout matches the resampled truth and non-decreasing in
/// every per-state error.
pub fn trajectory_loss<B: Backend>(
    predicted: &StateTrajectory<B>,
    truth: &TrajectoryBatch<B>,
    config: &LossConfig,
) -> Result<Tensor<B, 1>> {
    let truth = resample_trajectory(truth, predicted.timestamps.clone())?;
    let position = mse(predicted.positions.clone(), truth.positions);
    let rotation = mse(predicted.orientations.clone(), truth.orientations);
    let velocity = mse(predicted.linear_velocities.clone(), truth.linear_velocities)
        + mse(predicted.angular_velocities.clone(), truth.angular_velocities);

    Ok(position.mul_scalar(config.position_weight)
        + rotation.mul_scalar(config.rotation_weight)
        + velocity.mul_scalar(config.velocity_weight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RigidState;
    use crate::util::{float_tensor, scalar};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn truth(device: &<TestBackend as Backend>::Device) -> TrajectoryBatch<TestBackend> {
        let steps = 5;
        let positions = (0..steps).flat_map(|i| [i as f32, 0.0, 0.0]).collect();
        let rotations = (0..steps)
            .flat_map(|_| [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
            .collect();
        TrajectoryBatch {
            timestamps: float_tensor(vec![0.0, 0.5, 1.0, 1.5, 2.0], [1, steps], device),
            positions: float_tensor(positions, [1, steps, 3], device),
            linear_velocities: Tensor::zeros([1, steps, 3], device),
            orientations: float_tensor(rotations, [1, steps, 3, 3], device),
            angular_velocities: Tensor::zeros([1, steps, 3], device),
        }
    }

    fn state(x: f32, device: &<TestBackend as Backend>::Device) -> RigidState<TestBackend> {
        let mut pose = vec![0.0; 16];
        pose[0] = 1.0;
        pose[5] = 1.0;
        pose[10] = 1.0;
        pose[15] = 1.0;
        pose[3] = x;
        RigidState::from_pose(float_tensor(pose, [1, 4, 4], device)).unwrap()
    }

    #[test]
    fn test_resample_picks_nearest() {
        let device = Default::default();
        let stamps = float_tensor::<TestBackend, 2>(vec![0.1, 0.9, 1.6], [1, 3], &device);
        let resampled = resample_trajectory(&truth(&device), stamps).unwrap();
        let xs: Vec<f32> = to_vec(resampled.positions)
            .unwrap()
            .chunks(3)
            .map(|p| p[0])
            .collect();
        assert_eq!(xs, vec![0.0, 2.0, 3.0]);
        assert_eq!(resampled.orientations.dims(), [1, 3, 3, 3]);
    }

    #[test]
    fn test_matching_rollout_has_zero_loss() {
        let device = Default::default();
        let stamps = float_tensor::<TestBackend, 2>(vec![0.0, 0.5, 1.0], [1, 3], &device);
        let states = (0..3).map(|i| state(i as f32, &device)).collect();
        let predicted = StateTrajectory::from_states(stamps, states).unwrap();
        let loss = trajectory_loss(&predicted, &truth(&device), &LossConfig::new()).unwrap();
        assert_eq!(scalar(loss).unwrap(), 0.0);
    }

    #[test]
    fn test_loss_grows_with_error() {
        let device = Default::default();
        let stamps = || float_tensor::<TestBackend, 2>(vec![0.0, 0.5, 1.0], [1, 3], &device);
        let losses: Vec<f32> = [0.5f32, 1.0, 2.0]
            .iter()
            .map(|offset| {
                let states = (0..3).map(|i| state(i as f32 + offset, &device)).collect();
                let predicted = StateTrajectory::from_states(stamps(), states).unwrap();
                scalar(trajectory_loss(&predicted, &truth(&device), &LossConfig::new()).unwrap())
                    .unwrap()
            })
            .collect();
        assert!(losses[0] > 0.0);
        assert!(losses.windows(2).all(|w| w[1] > w[0]), "{:?}", losses);
    }
}
