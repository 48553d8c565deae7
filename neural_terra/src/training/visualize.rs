//! Visualization hooks fired when a best-so-far checkpoint is written.
//!
//! Snapshots are copied to the host so hooks never touch the autodiff graph.

use std::fmt::Write as _;
use std::path::PathBuf;

use burn::prelude::*;
use terra_io::write_to_csv;

use crate::data::TerrainBatch;
use crate::error::Result;
use crate::physics::StateTrajectory;
use crate::terrain::TerrainOutput;
use crate::util::to_vec;

use super::state::Split;

/// Host copy of one batch element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSnapshot {
    /// `(nx, ny)` of the encoder grid.
    pub shape: (usize, usize),
    /// Predicted geometry, row-major.
    pub geometry: Vec<f32>,
    /// Predicted terrain.
    pub terrain: Vec<f32>,
    /// Predicted friction.
    pub friction: Vec<f32>,
    /// Geometry label.
    pub geometry_label: Vec<f32>,
    /// Terrain label.
    pub terrain_label: Vec<f32>,
    /// Rollout timestamps.
    pub timestamps: Vec<f32>,
    /// Rollout positions.
    pub positions: Vec<[f32; 3]>,
    /// Ground-truth positions at their own timestamps.
    pub truth_timestamps: Vec<f32>,
    /// Ground-truth positions.
    pub truth_positions: Vec<[f32; 3]>,
}

/// Predictions and labels at a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualSnapshot {
    /// Split whose checkpoint fired.
    pub split: Split,
    /// Epoch.
    pub epoch: usize,
    /// Up to `vis_samples` elements.
    pub samples: Vec<SampleSnapshot>,
}

fn rows<B: Backend>(tensor: Tensor<B, 4>, n: usize) -> Result<Vec<Vec<f32>>> {
    let values = to_vec(tensor)?;
    let per = values.len() / n.max(1);
    Ok(values.chunks(per.max(1)).map(<[f32]>::to_vec).collect())
}

fn points(values: &[f32]) -> Vec<[f32; 3]> {
    values.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect()
}

impl VisualSnapshot {
    /// Copy the first `limit` batch elements to the host.
    pub fn capture<B: Backend>(
        split: Split,
        epoch: usize,
        output: &TerrainOutput<B>,
        batch: &TerrainBatch<B>,
        rollout: Option<&StateTrajectory<B>>,
        limit: usize,
    ) -> Result<Self> {
        let [b, _, nx, ny] = output.dims();
        let n = b.min(limit);

        let geometry = rows(output.geometry.clone(), b)?;
        let terrain = rows(output.terrain.clone(), b)?;
        let friction = rows(output.friction.clone(), b)?;
        let geometry_label = rows(batch.geometry.heights.clone(), b)?;
        let terrain_label = rows(batch.terrain.heights.clone(), b)?;

        let truth_steps = batch.trajectory.timestamps.dims()[1];
        let truth_ts = to_vec(batch.trajectory.timestamps.clone())?;
        let truth_pos = to_vec(batch.trajectory.positions.clone())?;
        let (pred_steps, pred_ts, pred_pos) = match rollout {
            Some(traj) => (
                traj.len(),
                to_vec(traj.timestamps.clone())?,
                to_vec(traj.positions.clone())?,
            ),
            None => (0, Vec::new(), Vec::new()),
        };

        let samples = (0..n)
            .map(|i| SampleSnapshot {
                shape: (nx, ny),
                geometry: geometry[i].clone(),
                terrain: terrain[i].clone(),
                friction: friction[i].clone(),
                geometry_label: geometry_label[i].clone(),
                terrain_label: terrain_label[i].clone(),
                timestamps: pred_ts
                    .get(i * pred_steps..(i + 1) * pred_steps)
                    .unwrap_or_default()
                    .to_vec(),
                positions: points(
                    pred_pos
                        .get(i * pred_steps * 3..(i + 1) * pred_steps * 3)
                        .unwrap_or_default(),
                ),
                truth_timestamps: truth_ts[i * truth_steps..(i + 1) * truth_steps].to_vec(),
                truth_positions: points(&truth_pos[i * truth_steps * 3..(i + 1) * truth_steps * 3]),
            })
            .collect();

        Ok(Self {
            split,
            epoch,
            samples,
        })
    }
}

/// Receives a snapshot whenever a best-so-far checkpoint is written.
pub trait VisualizationHook {
    /// Handle one snapshot.
    fn on_checkpoint(&mut self, snapshot: &VisualSnapshot) -> Result<()>;

    /// Whether snapshots should be captured at all.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Discards snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVisualizer;

impl VisualizationHook for NoopVisualizer {
    fn on_checkpoint(&mut self, _snapshot: &VisualSnapshot) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Writes each snapshot as CSV tables for offline plotting.
///
/// Per sample `i`, `<split>_<epoch>_<i>_grids.csv` holds one row per cell and
/// `<split>_<epoch>_<i>_trajectory.csv` the predicted and true positions.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
    written: usize,
}

impl SnapshotWriter {
    /// Write into `dir`, created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
        }
    }

    /// Snapshots written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    fn grids_table(sample: &SampleSnapshot) -> String {
        let (_, ny) = sample.shape;
        let mut text =
            String::from("ix,iy,geometry,terrain,friction,geometry_label,terrain_label\n");
        for (cell, value) in sample.geometry.iter().enumerate() {
            let _ = writeln!(
                text,
                "{},{},{},{},{},{},{}",
                cell / ny.max(1),
                cell % ny.max(1),
                value,
                sample.terrain[cell],
                sample.friction[cell],
                sample.geometry_label[cell],
                sample.terrain_label[cell]
            );
        }
        text
    }

    fn trajectory_table(sample: &SampleSnapshot) -> String {
        let mut text = String::from("source,t,x,y,z\n");
        let series = [
            ("predicted", &sample.timestamps, &sample.positions),
            ("truth", &sample.truth_timestamps, &sample.truth_positions),
        ];
        for (source, stamps, positions) in series {
            for (t, p) in stamps.iter().zip(positions.iter()) {
                let _ = writeln!(text, "{},{},{},{},{}", source, t, p[0], p[1], p[2]);
            }
        }
        text
    }
}

impl VisualizationHook for SnapshotWriter {
    fn on_checkpoint(&mut self, snapshot: &VisualSnapshot) -> Result<()> {
        for (i, sample) in snapshot.samples.iter().enumerate() {
            let stem = format!("{}_{:04}_{}", snapshot.split, snapshot.epoch, i);
            write_to_csv(
                self.dir.join(format!("{}_grids.csv", stem)),
                &Self::grids_table(sample),
                false,
                true,
            )?;
            write_to_csv(
                self.dir.join(format!("{}_trajectory.csv", stem)),
                &Self::trajectory_table(sample),
                false,
                true,
            )?;
        }
        self.written += 1;
        log::debug!(
            "Wrote {} {} snapshot(s) for epoch {}",
            snapshot.samples.len(),
            snapshot.split,
            snapshot.epoch
        );
        Ok(())
    }
}
