//! Integration tests for loss aggregation over synthetic batches.

use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;

use neural_terra::{
    config::{EncoderConfig, LossConfig, PhysicsConfig, TerrainGridConfig, TrainingConfig},
    data::{HeightLabel, SlopedPlane, SyntheticTerrain, TerrainBatch, TerrainSample},
    loss::LossAggregator,
    util::to_vec,
    TerrainOutput,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

type AD = Autodiff<NdArray>;

fn config(loss: LossConfig) -> TrainingConfig {
    TrainingConfig::new("voxelnet".to_string())
        .with_grid(
            TerrainGridConfig::new()
                .with_xbound([-1.6, 1.6, 0.4])
                .with_ybound([-1.6, 1.6, 0.4])
                .with_dbound([1.0, 3.0, 1.0]),
        )
        .with_physics(
            PhysicsConfig::new()
                .with_grid_res(0.8)
                .with_d_max(1.6)
                .with_dt(0.05),
        )
        .with_encoder(EncoderConfig::tiny())
        .with_loss(loss)
}

fn flat_sample(cfg: &TrainingConfig) -> TerrainSample {
    let grid = cfg.grid.bev_grid().unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    SyntheticTerrain::new(grid, 5, 0.1).sample(&SlopedPlane::flat(0.0), [0.5, 0.0], &mut rng)
}

fn constant_output(height: f32, device: &<AD as Backend>::Device) -> (TerrainOutput<AD>, Tensor<AD, 4>) {
    let terrain = Tensor::<AD, 4>::ones([1, 1, 8, 8], device)
        .mul_scalar(height)
        .require_grad();
    let output = TerrainOutput {
        geometry: Tensor::ones([1, 1, 8, 8], device).mul_scalar(height),
        terrain: terrain.clone(),
        friction: Tensor::ones([1, 1, 8, 8], device).mul_scalar(0.8),
        difference: Tensor::zeros([1, 1, 8, 8], device),
    };
    (output, terrain)
}

#[test]
fn test_all_weights_zero_gives_exact_zero() {
    let cfg = config(
        LossConfig::new()
            .with_geometry_weight(0.0)
            .with_terrain_weight(0.0)
            .with_physics_weight(0.0),
    );
    let device = Default::default();
    let batch = TerrainBatch::<AD>::collate(&[flat_sample(&cfg)], &device).unwrap();
    let (output, terrain) = constant_output(0.3, &device);

    let losses = LossAggregator::from_config(&cfg)
        .unwrap()
        .compute(&output, &batch)
        .unwrap();
    let scalars = losses.scalars().unwrap();
    assert_eq!(scalars.geometry, 0.0);
    assert_eq!(scalars.terrain, 0.0);
    assert_eq!(scalars.physics, 0.0);
    assert_eq!(scalars.total, 0.0);

    // No active term, so nothing reaches the autodiff tape.
    assert!(!losses.total.is_require_grad());
    assert!(terrain.is_require_grad());
}

#[test]
fn test_zero_weight_term_is_never_evaluated() {
    let cfg = config(
        LossConfig::new()
            .with_geometry_weight(1.0)
            .with_terrain_weight(0.0)
            .with_physics_weight(0.0),
    );
    let device = Default::default();
    let batch = TerrainBatch::<AD>::collate(&[flat_sample(&cfg)], &device).unwrap();
    let (mut output, _) = constant_output(0.5, &device);
    output.terrain = Tensor::ones([1, 1, 8, 8], &device).mul_scalar(f32::NAN);

    let scalars = LossAggregator::from_config(&cfg)
        .unwrap()
        .compute(&output, &batch)
        .unwrap()
        .scalars()
        .unwrap();
    assert_eq!(scalars.terrain, 0.0);
    assert!((scalars.geometry - 0.25).abs() < 1e-5, "{:?}", scalars);
    assert!((scalars.total - scalars.geometry).abs() < 1e-7);
    assert!(scalars.is_finite());
}

#[test]
fn test_physics_term_trains_terrain() {
    let cfg = config(
        LossConfig::new()
            .with_geometry_weight(0.0)
            .with_terrain_weight(0.0)
            .with_physics_weight(1.0),
    );
    let device = Default::default();
    let batch = TerrainBatch::<AD>::collate(&[flat_sample(&cfg)], &device).unwrap();
    let (output, terrain) = constant_output(0.6, &device);

    let losses = LossAggregator::from_config(&cfg)
        .unwrap()
        .compute(&output, &batch)
        .unwrap();
    let scalars = losses.scalars().unwrap();
    assert!(scalars.physics > 0.0);
    assert_eq!(scalars.geometry, 0.0);

    let grads = losses.total.backward();
    let dterrain = to_vec(terrain.grad(&grads).expect("terrain gradient")).unwrap();
    // Lowering the predicted terrain toward the recorded z reduces the loss.
    assert!(dterrain.iter().sum::<f32>() > 0.0);
}

#[test]
fn test_masked_nan_label_is_ignored() {
    let cfg = config(
        LossConfig::new()
            .with_terrain_weight(0.0)
            .with_physics_weight(0.0)
            .with_curvature_weight(0.0),
    );
    let device = Default::default();
    let mut sample = flat_sample(&cfg);
    sample.geometry.heights[0] = f32::NAN;
    sample.geometry.mask[0] = 0.0;
    let batch = TerrainBatch::<AD>::collate(&[sample], &device).unwrap();
    let (output, _) = constant_output(0.0, &device);

    let scalars = LossAggregator::from_config(&cfg)
        .unwrap()
        .compute(&output, &batch)
        .unwrap()
        .scalars()
        .unwrap();
    assert!(scalars.is_finite());
    assert!(scalars.geometry.abs() < 1e-7);
}

#[test]
fn test_unmasked_nan_label_poisons_total() {
    let cfg = config(
        LossConfig::new()
            .with_terrain_weight(0.0)
            .with_physics_weight(0.0),
    );
    let device = Default::default();
    let mut sample = flat_sample(&cfg);
    sample.geometry = HeightLabel::constant(f32::NAN, (8, 8));
    let batch = TerrainBatch::<AD>::collate(&[sample], &device).unwrap();
    let (output, _) = constant_output(0.0, &device);

    let scalars = LossAggregator::from_config(&cfg)
        .unwrap()
        .compute(&output, &batch)
        .unwrap()
        .scalars()
        .unwrap();
    assert!(!scalars.is_finite());
    assert!(scalars.total.is_nan());
}
