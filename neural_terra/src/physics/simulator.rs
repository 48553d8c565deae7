use burn::prelude::*;
use terra_core::truncate_horizon;

use crate::config::PhysicsConfig;
use crate::error::{NeuralTerraError, Result};
use crate::util::{float_tensor, to_vec};

use super::sampling::GridSampler;
use super::state::{Controls, PhysicsGrids, RigidState, StateTrajectory};

/// A differentiable rollout over terrain grids.
pub trait PhysicsSimulator {
    /// Integrate every batch element from `initial` under `controls`.
    ///
    /// The returned trajectory holds one state per control timestamp inside the
    /// horizon, with index 0 equal to `initial`.
    fn rollout<B: Backend>(
        &self,
        grids: &PhysicsGrids<B>,
        initial: RigidState<B>,
        controls: &Controls<B>,
    ) -> Result<StateTrajectory<B>>;
}

/// Planar differential-drive body that rides the terrain surface.
///
/// Linear velocity and yaw rate relax toward their commands at a rate scaled by
/// the friction under the body. Height relaxes toward the terrain and the body
/// frame follows the local surface normal. The control at index `k - 1` is held
/// over `[t_{k-1}, t_k]`.
#[derive(Debug, Clone)]
pub struct DiffDriveSimulator {
    config: PhysicsConfig,
    sampler: GridSampler,
}

struct Planar<B: Backend> {
    x: Tensor<B, 2>,
    y: Tensor<B, 2>,
}

impl DiffDriveSimulator {
    /// Simulator with the given parameters.
    pub fn new(config: PhysicsConfig) -> Self {
        let sampler = GridSampler::new(config.d_max, config.grid_res);
        Self { config, sampler }
    }

    /// Parameters.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Body frame with z along the terrain normal and x along the heading.
    fn surface_frame<B: Backend>(
        &self,
        height: &Tensor<B, 3>,
        position: &Planar<B>,
        heading: &Planar<B>,
    ) -> Result<Tensor<B, 3>> {
        let r = self.config.grid_res;
        let at = |dx: f32, dy: f32| {
            self.sampler.sample(
                height.clone(),
                position.x.clone().add_scalar(dx),
                position.y.clone().add_scalar(dy),
            )
        };
        let sx = (at(r, 0.0)? - at(-r, 0.0)?).div_scalar(2.0 * r);
        let sy = (at(0.0, r)? - at(0.0, -r)?).div_scalar(2.0 * r);

        let scale = (sx.clone().powf_scalar(2.0) + sy.clone().powf_scalar(2.0))
            .add_scalar(1.0)
            .sqrt();
        let nx = sx.neg() / scale.clone();
        let ny = sy.neg() / scale.clone();
        let nz = scale.recip();

        let dot = heading.x.clone() * nx.clone() + heading.y.clone() * ny.clone();
        let xx = heading.x.clone() - dot.clone() * nx.clone();
        let xy = heading.y.clone() - dot.clone() * ny.clone();
        let xz = dot.neg() * nz.clone();
        let norm = (xx.clone().powf_scalar(2.0)
            + xy.clone().powf_scalar(2.0)
            + xz.clone().powf_scalar(2.0))
        .sqrt()
        .clamp_min(1e-6);
        let (xx, xy, xz) = (xx / norm.clone(), xy / norm.clone(), xz / norm);

        let yx = ny.clone() * xz.clone() - nz.clone() * xy.clone();
        let yy = nz.clone() * xx.clone() - nx.clone() * xz.clone();
        let yz = nx.clone() * xy.clone() - ny.clone() * xx.clone();

        let rows = vec![
            Tensor::cat(vec![xx, yx, nx], 1),
            Tensor::cat(vec![xy, yy, ny], 1),
            Tensor::cat(vec![xz, yz, nz], 1),
        ];
        Ok(Tensor::stack(rows, 1))
    }
}

impl PhysicsSimulator for DiffDriveSimulator {
    fn rollout<B: Backend>(
        &self,
        grids: &PhysicsGrids<B>,
        initial: RigidState<B>,
        controls: &Controls<B>,
    ) -> Result<StateTrajectory<B>> {
        let [batch, _, _] = grids.dims();
        let [cb, steps_total, channels] = controls.commands.dims();
        if initial.batch_size() != batch || cb != batch || channels != 2 {
            return Err(NeuralTerraError::ShapeMismatch {
                expected: vec![batch, steps_total, 2],
                got: vec![cb, steps_total, channels],
            });
        }
        if controls.timestamps.dims() != [batch, steps_total] || steps_total == 0 {
            return Err(NeuralTerraError::ShapeMismatch {
                expected: vec![batch, steps_total.max(1)],
                got: controls.timestamps.dims().to_vec(),
            });
        }

        let device = grids.height.device();
        let cfg = &self.config;
        let stamps = to_vec(controls.timestamps.clone())?;
        let steps = stamps
            .chunks(steps_total)
            .map(|row| truncate_horizon(row, cfg.traj_sim_time))
            .min()
            .unwrap_or(1)
            .max(1);

        let height = grids.height.clone().clamp(-cfg.h_max, cfg.h_max);
        let friction = grids.friction.clone();

        let column = |t: Tensor<B, 2>, i: usize| t.slice([0..batch, i..i + 1]);
        let axis = |r: usize| {
            initial
                .orientation
                .clone()
                .slice([0..batch, r..r + 1, 0..1])
                .reshape([batch, 1])
        };
        let heading_norm = (axis(0).powf_scalar(2.0) + axis(1).powf_scalar(2.0))
            .sqrt()
            .clamp_min(1e-6);
        let mut heading = Planar {
            x: axis(0) / heading_norm.clone(),
            y: axis(1) / heading_norm,
        };

        let mut position = Planar {
            x: column(initial.position.clone(), 0),
            y: column(initial.position.clone(), 1),
        };
        let mut z = column(initial.position.clone(), 2);
        let zeros = Tensor::<B, 2>::zeros([batch, 1], &device);
        let mut velocity = Planar {
            x: zeros.clone(),
            y: zeros.clone(),
        };
        let mut vz = zeros.clone();
        let mut yaw_rate = zeros.clone();

        let mut states = Vec::with_capacity(steps);
        states.push(initial.clone());

        for k in 1..steps {
            let durations: Vec<f32> = (0..batch)
                .map(|b| (stamps[b * steps_total + k] - stamps[b * steps_total + k - 1]).max(0.0))
                .collect();
            let longest = durations.iter().copied().fold(0.0f32, f32::max);
            let substeps = ((longest / cfg.dt).ceil() as usize).max(1);
            let h = float_tensor::<B, 2>(
                durations.iter().map(|d| d / substeps as f32).collect(),
                [batch, 1],
                &device,
            );
            let h_safe = h.clone().clamp_min(1e-6);

            let command = controls
                .commands
                .clone()
                .slice([0..batch, k - 1..k, 0..2])
                .reshape([batch, 2]);
            let v_cmd = column(command.clone(), 0);
            let w_cmd = column(command, 1);
            let settle = h.clone().mul_scalar(-cfg.vertical_gain).exp().neg().add_scalar(1.0);

            for _ in 0..substeps {
                let mu = self
                    .sampler
                    .sample(friction.clone(), position.x.clone(), position.y.clone())?;
                let grip = h.clone() * mu;
                let a_v = grip.clone().mul_scalar(cfg.velocity_gain).clamp_max(1.0);
                let a_w = grip.mul_scalar(cfg.yaw_gain).clamp_max(1.0);

                let target_x = heading.x.clone() * v_cmd.clone();
                let target_y = heading.y.clone() * v_cmd.clone();
                velocity = Planar {
                    x: velocity.x.clone() + (target_x - velocity.x) * a_v.clone(),
                    y: velocity.y.clone() + (target_y - velocity.y) * a_v,
                };
                yaw_rate = yaw_rate.clone() + (w_cmd.clone() - yaw_rate) * a_w;

                let angle = yaw_rate.clone() * h.clone();
                let (cos, sin) = (angle.clone().cos(), angle.sin());
                heading = Planar {
                    x: heading.x.clone() * cos.clone() - heading.y.clone() * sin.clone(),
                    y: heading.x * sin + heading.y * cos,
                };

                position = Planar {
                    x: position.x + velocity.x.clone() * h.clone(),
                    y: position.y + velocity.y.clone() * h.clone(),
                };

                let ground = self
                    .sampler
                    .sample(height.clone(), position.x.clone(), position.y.clone())?
                    .add_scalar(cfg.clearance);
                let dz = (ground - z.clone()) * settle.clone();
                vz = dz.clone() / h_safe.clone();
                z = z + dz;
            }

            let orientation = self.surface_frame(&height, &position, &heading)?;
            states.push(RigidState {
                position: Tensor::cat(vec![position.x.clone(), position.y.clone(), z.clone()], 1),
                linear_velocity: Tensor::cat(
                    vec![velocity.x.clone(), velocity.y.clone(), vz.clone()],
                    1,
                ),
                orientation,
                angular_velocity: Tensor::cat(vec![zeros.clone(), zeros.clone(), yaw_rate.clone()], 1),
            });
        }

        let timestamps = controls.timestamps.clone().slice([0..batch, 0..steps]);
        StateTrajectory::from_states(timestamps, states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use terra_core::{Mat3, Point3, Pose};

    type TestBackend = NdArray;

    fn config() -> PhysicsConfig {
        PhysicsConfig::new()
            .with_grid_res(1.0)
            .with_d_max(2.0)
            .with_h_max(5.0)
            .with_dt(0.05)
    }

    fn constant<B: Backend>(value: f32, device: &B::Device) -> Tensor<B, 3> {
        Tensor::ones([1, 4, 4], device).mul_scalar(value)
    }

    fn pose<B: Backend>(pose: Pose, device: &B::Device) -> Tensor<B, 3> {
        float_tensor(pose.to_matrix().to_vec(), [1, 4, 4], device)
    }

    fn controls<B: Backend>(command: [f32; 2], steps: usize, device: &B::Device) -> Controls<B> {
        let stamps = (0..steps).map(|i| i as f32 * 0.1).collect();
        let commands = (0..steps).flat_map(|_| command).collect();
        Controls {
            timestamps: float_tensor(stamps, [1, steps], device),
            commands: float_tensor(commands, [1, steps, 2], device),
        }
    }

    fn at_height(z: f32) -> Pose {
        Pose::from_translation(Point3::new(0.0, 0.0, z))
    }

    #[test]
    fn test_stationary_on_flat_terrain() {
        let device = Default::default();
        let grids = PhysicsGrids::new(constant::<TestBackend>(1.0, &device), constant(1.0, &device));
        let initial = RigidState::from_pose(pose(at_height(1.0), &device)).unwrap();
        let sim = DiffDriveSimulator::new(config());
        let traj = sim
            .rollout(&grids, initial, &controls([0.0, 0.0], 10, &device))
            .unwrap();
        assert_eq!(traj.len(), 10);
        let positions = to_vec(traj.positions).unwrap();
        for p in positions.chunks(3) {
            assert!(p[0].abs() < 1e-5 && p[1].abs() < 1e-5, "{:?}", p);
            assert!((p[2] - 1.0).abs() < 1e-5, "{:?}", p);
        }
        let rotations = to_vec(traj.orientations).unwrap();
        let identity = Mat3::IDENTITY.to_row_major();
        for r in rotations.chunks(9) {
            for (a, b) in r.iter().zip(identity.iter()) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_forward_command_moves_along_heading() {
        let device = Default::default();
        let grids = PhysicsGrids::new(constant::<TestBackend>(0.0, &device), constant(1.0, &device));
        let initial = RigidState::from_pose(pose(at_height(0.0), &device)).unwrap();
        let traj = DiffDriveSimulator::new(config())
            .rollout(&grids, initial, &controls([1.0, 0.0], 8, &device))
            .unwrap();
        let positions = to_vec(traj.positions).unwrap();
        let xs: Vec<f32> = positions.chunks(3).map(|p| p[0]).collect();
        assert!(xs.windows(2).all(|w| w[1] > w[0]), "{:?}", xs);
        assert!(positions.chunks(3).all(|p| p[1].abs() < 1e-5));
    }

    #[test]
    fn test_zero_friction_prevents_motion() {
        let device = Default::default();
        let grids = PhysicsGrids::new(constant::<TestBackend>(0.0, &device), constant(0.0, &device));
        let initial = RigidState::from_pose(pose(at_height(0.0), &device)).unwrap();
        let traj = DiffDriveSimulator::new(config())
            .rollout(&grids, initial, &controls([1.0, 1.0], 5, &device))
            .unwrap();
        assert!(to_vec(traj.positions).unwrap().iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_horizon_truncates_rollout() {
        let device = Default::default();
        let grids = PhysicsGrids::new(constant::<TestBackend>(0.0, &device), constant(1.0, &device));
        let initial = RigidState::from_pose(pose(at_height(0.0), &device)).unwrap();
        let traj = DiffDriveSimulator::new(config().with_traj_sim_time(0.25))
            .rollout(&grids, initial, &controls([1.0, 0.0], 10, &device))
            .unwrap();
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.timestamps.dims(), [1, 3]);
    }

    #[test]
    fn test_yaw_command_turns_heading() {
        let device = Default::default();
        let grids = PhysicsGrids::new(constant::<TestBackend>(0.0, &device), constant(1.0, &device));
        let initial = RigidState::from_pose(pose(at_height(0.0), &device)).unwrap();
        let traj = DiffDriveSimulator::new(config())
            .rollout(&grids, initial, &controls([0.0, 1.0], 6, &device))
            .unwrap();
        let omegas = to_vec(traj.angular_velocities).unwrap();
        let last = &omegas[omegas.len() - 3..];
        assert!(last[2] > 0.0);
        let rotations = to_vec(traj.orientations).unwrap();
        let last = &rotations[rotations.len() - 9..];
        // x axis rotated toward +y
        assert!(last[3] > 0.0);
    }

    #[test]
    fn test_gradients_reach_grids() {
        type AD = Autodiff<TestBackend>;
        let device = Default::default();
        let height = constant::<AD>(0.5, &device).require_grad();
        let friction = constant::<AD>(0.5, &device).require_grad();
        let grids = PhysicsGrids::new(height.clone(), friction.clone());
        let initial = RigidState::from_pose(pose(at_height(0.0), &device)).unwrap();
        let traj = DiffDriveSimulator::new(config())
            .rollout(&grids, initial, &controls([1.0, 0.0], 4, &device))
            .unwrap();
        let grads = traj.positions.sum().backward();
        assert!(height.grad(&grads).is_some());
        assert!(friction.grad(&grads).is_some());
    }

    #[test]
    fn test_rejects_mismatched_batch() {
        let device = Default::default();
        let grids = PhysicsGrids::new(
            Tensor::<TestBackend, 3>::zeros([2, 4, 4], &device),
            Tensor::zeros([2, 4, 4], &device),
        );
        let initial = RigidState::from_pose(pose(at_height(0.0), &device)).unwrap();
        let result = DiffDriveSimulator::new(config()).rollout(
            &grids,
            initial,
            &controls([0.0, 0.0], 3, &device),
        );
        assert!(result.is_err());
    }
}
