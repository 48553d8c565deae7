//! Example: training a terrain encoder on procedural sloped-plane data.
//!
//! The workflow:
//! 1. Generate tilted-plane samples with lidar points, a camera and
//!    unicycle trajectories
//! 2. Train the chosen encoder variant against height and trajectory losses
//! 3. Reload the best checkpoint and run one inference frame
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info cargo run -p neural_terra --example train_synthetic -- voxelnet
//! ```
//!
//! Runs are written under `runs/synthetic/`.

use std::sync::Arc;

use burn::backend::{Autodiff, NdArray};

use neural_terra::{
    config::{EncoderConfig, ImageAugConfig, PhysicsConfig, TerrainGridConfig, TrainingConfig},
    data::{InMemoryDataset, SyntheticTerrain},
    inference::{
        CalibrationSource, CameraCalibration, CameraInfo, SensorFrame, TerrainInference,
    },
    training::{weights_path, CheckpointKind, TerrainTrainer},
    Point3, Result,
};

type MyBackend = Autodiff<NdArray>;

const OUTPUT_DIR: &str = "runs";
const NUM_SAMPLES: usize = 24;

/// Cameras are never used by the point-cloud demo frame.
struct NoCameras;

impl CalibrationSource for NoCameras {
    fn resolve(&self, camera: &CameraInfo) -> Result<CameraCalibration> {
        Err(neural_terra::NeuralTerraError::Calibration {
            message: format!("no calibration for {}", camera.name),
        })
    }
}

fn main() {
    env_logger::init();

    let model = std::env::args().nth(1).unwrap_or_else(|| "voxelnet".to_string());
    if let Err(e) = run(&model) {
        eprintln!("Training failed: {}", e);
        std::process::exit(1);
    }
}

fn run(model: &str) -> Result<()> {
    let device = burn::backend::ndarray::NdArrayDevice::Cpu;

    let config = TrainingConfig::new(model.to_string())
        .with_grid(
            TerrainGridConfig::new()
                .with_xbound([-3.2, 3.2, 0.2])
                .with_ybound([-3.2, 3.2, 0.2])
                .with_dbound([1.0, 5.0, 0.5]),
        )
        .with_augmentation(ImageAugConfig::new().with_final_dim([32, 64]))
        .with_physics(
            PhysicsConfig::new()
                .with_grid_res(0.4)
                .with_d_max(3.2)
                .with_traj_sim_time(2.0)
                .with_dt(0.05),
        )
        .with_encoder(EncoderConfig::tiny())
        .with_dataset("synthetic".to_string())
        .with_output_dir(OUTPUT_DIR.to_string())
        .with_num_epochs(5)
        .with_batch_size(4)
        .with_learning_rate(1e-3)
        .with_val_fraction(0.25);

    // Step 1: data
    let grid = config
        .grid
        .bev_grid()
        .map_err(neural_terra::NeuralTerraError::config)?;
    let samples = SyntheticTerrain::new(grid, 21, 0.1)
        .with_points_per_cell(2)
        .with_camera([32, 64])
        .with_max_slope(0.15)
        .generate(NUM_SAMPLES, 0);
    println!("Generated {} synthetic samples", samples.len());

    // Step 2: training
    let mut trainer = TerrainTrainer::<MyBackend>::new(
        config.clone(),
        Arc::new(InMemoryDataset::new(samples)),
        device,
    )?
    .with_snapshots();
    let state = trainer.fit()?;
    println!(
        "Finished {} epochs: best train {:.5}, best val {:.5}",
        state.epoch, state.best_train_loss, state.best_val_loss
    );
    let best = weights_path(trainer.run_dir(), CheckpointKind::ValBest);
    println!("Best weights: {}", best.display());

    // Step 3: inference with the best weights
    if trainer.adapter().variant().uses_images() {
        println!("Skipping the inference demo: it feeds a point cloud only");
        return Ok(());
    }
    let engine = TerrainInference::<NdArray>::from_weights(
        &config,
        &best,
        Box::new(NoCameras),
        "base_link",
        burn::backend::ndarray::NdArrayDevice::Cpu,
    )?;
    let frame = SensorFrame {
        stamp: 0.0,
        points: Some(
            (0..200)
                .map(|i| {
                    let (x, y) = ((i % 20) as f32 * 0.3 - 3.0, (i / 20) as f32 * 0.6 - 3.0);
                    Point3::new(x, y, 0.1 * x)
                })
                .collect(),
        ),
        ..Default::default()
    };
    match engine.process(&frame, 0.05)? {
        Some(grid) => {
            let mean = grid.heights.iter().sum::<f32>() / grid.heights.len() as f32;
            println!(
                "Inferred {}x{} terrain grid, mean height {:.3} m",
                grid.shape.0, grid.shape.1, mean
            );
        }
        None => println!("Frame dropped"),
    }
    Ok(())
}
