//! Differentiable physics rollout.
//!
//! A [`PhysicsSimulator`] integrates a rigid body over a height and friction
//! grid under a sequence of `(v, omega)` commands. Every operation stays on the
//! autodiff tape so the trajectory error reaches the encoder.

mod sampling;
mod simulator;
mod state;

pub use sampling::GridSampler;
pub use simulator::{DiffDriveSimulator, PhysicsSimulator};
pub use state::{Controls, PhysicsGrids, RigidState, StateTrajectory};
