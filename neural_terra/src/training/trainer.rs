//! Epoch-driven trainer for terrain encoders.

use std::path::Path;
use std::sync::Arc;

use burn::config::Config;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use terra_io::{RunDirectory, TerraIoError};

use crate::adapter::ModelAdapter;
use crate::config::TrainingConfig;
use crate::data::{debug_indices, split_indices, BatchLoader, SubsetDataset, TerrainDataset};
use crate::error::{NeuralTerraError, Result};
use crate::loss::{LossAggregator, LossScalars};
use crate::nn::TerrainModel;

use super::checkpoint::{load_weights, save_checkpoint, CheckpointKind, CheckpointMetadata};
use super::clip::clip_global_norm;
use super::metrics::{EpochAccumulator, MetricsLogger};
use super::state::{Split, TrainerPhase, TrainerState};
use super::visualize::{NoopVisualizer, SnapshotWriter, VisualSnapshot, VisualizationHook};

type TerrainOptimizer<B> = OptimizerAdaptor<Adam, TerrainModel<B>, B>;

/// Trains one encoder variant against the geometry, terrain and trajectory
/// losses.
///
/// Construction validates everything up front. The run directory is created
/// last, so a rejected configuration leaves nothing on disk.
pub struct TerrainTrainer<B: AutodiffBackend> {
    config: TrainingConfig,
    adapter: ModelAdapter,
    aggregator: LossAggregator,
    model: TerrainModel<B>,
    optimizer: TerrainOptimizer<B>,
    train_loader: BatchLoader,
    val_loader: BatchLoader,
    run: RunDirectory,
    metrics: MetricsLogger,
    visualizer: Box<dyn VisualizationHook>,
    state: TrainerState,
    device: B::Device,
}

impl<B: AutodiffBackend> TerrainTrainer<B> {
    /// Build a trainer over `dataset`.
    pub fn new(
        config: TrainingConfig,
        dataset: Arc<dyn TerrainDataset>,
        device: B::Device,
    ) -> Result<Self> {
        config.validate().map_err(NeuralTerraError::config)?;
        let adapter = ModelAdapter::new(&config)?;
        let aggregator = LossAggregator::from_config(&config)?;

        let mut model = adapter.init_model::<B>(&config, &device);
        if let Some(path) = &config.pretrained_model_path {
            model = load_weights(model, path, &device)?;
            log::info!("Loaded pretrained weights from {}", path);
        }

        let (train_ids, val_ids) = if config.debug {
            let ids = debug_indices(dataset.len(), config.seed);
            (ids.clone(), ids)
        } else {
            split_indices(dataset.len(), config.val_fraction, config.seed)
        };
        if train_ids.is_empty() {
            return Err(NeuralTerraError::InvalidData(
                "no training samples after the validation split".to_string(),
            ));
        }
        log::info!(
            "Training {} on {} samples, validating on {}",
            adapter.variant(),
            train_ids.len(),
            val_ids.len()
        );
        let train_loader = BatchLoader::shuffled(
            Arc::new(SubsetDataset::new(Arc::clone(&dataset), train_ids)),
            config.batch_size,
            config.seed,
        );
        let val_loader = BatchLoader::sequential(
            Arc::new(SubsetDataset::new(dataset, val_ids)),
            config.batch_size,
        );

        let optimizer = config.optimizer().init();
        let run = RunDirectory::create(&config.output_dir, &config.dataset, adapter.variant().name())?;
        log::info!("Run directory {:?}", run.path());
        let metrics = MetricsLogger::new(run.scalars_path());

        Ok(Self {
            config,
            adapter,
            aggregator,
            model,
            optimizer,
            train_loader,
            val_loader,
            run,
            metrics,
            visualizer: Box::new(NoopVisualizer),
            state: TrainerState::new(),
            device,
        })
    }

    /// Replace the visualization hook.
    pub fn with_visualizer(mut self, visualizer: Box<dyn VisualizationHook>) -> Self {
        self.visualizer = visualizer;
        self
    }

    /// Write CSV snapshots into the run directory.
    pub fn with_snapshots(self) -> Self {
        let writer = SnapshotWriter::new(self.run.visuals_dir());
        self.with_visualizer(Box::new(writer))
    }

    /// Run configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Counters and trackers.
    pub fn state(&self) -> &TrainerState {
        &self.state
    }

    /// Current weights.
    pub fn model(&self) -> &TerrainModel<B> {
        &self.model
    }

    /// Input assembly for the configured variant.
    pub fn adapter(&self) -> &ModelAdapter {
        &self.adapter
    }

    /// Directory holding checkpoints, configs and metrics.
    pub fn run_dir(&self) -> &Path {
        self.run.path()
    }

    /// Consume the trainer, keeping the weights.
    pub fn into_model(self) -> TerrainModel<B> {
        self.model
    }

    /// Train for the configured number of epochs.
    ///
    /// A non-finite loss writes `emergency.mpk`, moves the trainer to
    /// [`TrainerPhase::Failed`] and returns [`NeuralTerraError::NonFiniteLoss`].
    pub fn fit(&mut self) -> Result<TrainerState> {
        if self.state.is_failed() {
            return Err(NeuralTerraError::config("trainer already failed"));
        }
        self.save_configs()?;

        for epoch in self.state.epoch..self.config.num_epochs {
            let train = self.train_epoch(epoch)?;
            self.finish_epoch(Split::Train, epoch, &train)?;

            if self.val_loader.num_batches() > 0 {
                let val = self.val_epoch(epoch)?;
                self.finish_epoch(Split::Val, epoch, &val)?;
            }

            self.state.epoch = epoch + 1;
        }

        self.state.phase = TrainerPhase::Done;
        log::info!(
            "Training finished after {} epochs: best train {:.6}, best val {:.6}",
            self.state.epoch,
            self.state.best_train_loss,
            self.state.best_val_loss
        );
        Ok(self.state.clone())
    }

    fn save_configs(&self) -> Result<()> {
        self.config
            .grid
            .save(self.run.config_path("grid_cfg"))
            .map_err(TerraIoError::from)?;
        self.config
            .physics
            .save(self.run.config_path("physics_cfg"))
            .map_err(TerraIoError::from)?;
        self.config
            .save(self.run.config_path("training_cfg"))
            .map_err(TerraIoError::from)?;
        Ok(())
    }

    fn train_epoch(&mut self, epoch: usize) -> Result<LossScalars> {
        self.state.phase = TrainerPhase::TrainEpoch;
        let mut accumulator = EpochAccumulator::new();

        for indices in self.train_loader.epoch_order() {
            let batch = self.train_loader.load::<B>(&indices, &self.device)?;
            let output = self.adapter.forward(&self.model, &batch)?;
            let losses = self.aggregator.compute(&output, &batch)?;
            let scalars = losses.scalars()?;
            if !scalars.is_finite() {
                return Err(self.abort(Split::Train, epoch, scalars.total));
            }

            // Every weight zero leaves the total off the tape: nothing to step.
            if losses.total.is_require_grad() {
                let mut grads = GradientsParams::from_grads(losses.total.backward(), &self.model);
                let norm =
                    clip_global_norm::<B, _>(&self.model, &mut grads, self.config.max_grad_norm)?;
                log::trace!("gradient norm {:.6}", norm);
                self.model = self
                    .optimizer
                    .step(self.config.learning_rate, self.model.clone(), grads);
            }

            self.record_step(Split::Train, &scalars)?;
            accumulator.add(&scalars);
        }
        Ok(accumulator.mean())
    }

    fn val_epoch(&mut self, epoch: usize) -> Result<LossScalars> {
        self.state.phase = TrainerPhase::ValEpoch;
        let model = self.model.valid();
        let mut accumulator = EpochAccumulator::new();

        for indices in self.val_loader.epoch_order() {
            let batch = self.val_loader.load::<B::InnerBackend>(&indices, &self.device)?;
            let output = self.adapter.forward(&model, &batch)?;
            let scalars = self.aggregator.compute(&output, &batch)?.scalars()?;
            if !scalars.is_finite() {
                return Err(self.abort(Split::Val, epoch, scalars.total));
            }
            self.record_step(Split::Val, &scalars)?;
            accumulator.add(&scalars);
        }
        Ok(accumulator.mean())
    }

    fn record_step(&mut self, split: Split, scalars: &LossScalars) -> Result<()> {
        let step = self.state.step(split);
        self.metrics.log_step(split, step, scalars)?;
        log::debug!(
            "{} step {}: total={:.6} geom={:.6} terrain={:.6} phys={:.6}",
            split,
            step,
            scalars.total,
            scalars.geometry,
            scalars.terrain,
            scalars.physics
        );
        self.state.advance_step(split);
        Ok(())
    }

    fn finish_epoch(&mut self, split: Split, epoch: usize, losses: &LossScalars) -> Result<()> {
        self.metrics.log_epoch(split, epoch, losses)?;
        log::info!(
            "Epoch {}/{} {}: total={:.6} geom={:.6} terrain={:.6} phys={:.6}",
            epoch + 1,
            self.config.num_epochs,
            split,
            losses.total,
            losses.geometry,
            losses.terrain,
            losses.physics
        );
        if self
            .state
            .record_epoch_loss(split, losses.total, self.config.debug)
        {
            self.checkpoint(split, epoch, losses.total)?;
        }
        Ok(())
    }

    fn metadata(&self, epoch: usize, loss: f32) -> CheckpointMetadata {
        CheckpointMetadata::new(
            self.adapter.variant().name().to_string(),
            epoch,
            self.state.train_step,
            self.state.val_step,
            loss,
        )
    }

    fn checkpoint(&mut self, split: Split, epoch: usize, loss: f32) -> Result<()> {
        self.state.phase = TrainerPhase::Checkpoint;
        let kind = match split {
            Split::Train => CheckpointKind::TrainBest,
            Split::Val => CheckpointKind::ValBest,
        };
        save_checkpoint(&self.model, self.run.path(), kind, &self.metadata(epoch, loss))?;
        if self.visualizer.is_enabled() {
            let snapshot = self.snapshot(split, epoch)?;
            self.visualizer.on_checkpoint(&snapshot)?;
        }
        Ok(())
    }

    fn snapshot(&self, split: Split, epoch: usize) -> Result<VisualSnapshot> {
        let loader = match split {
            Split::Train => &self.train_loader,
            Split::Val => &self.val_loader,
        };
        let count = loader.dataset().len().min(self.config.vis_samples.max(1));
        let indices: Vec<usize> = (0..count).collect();
        let batch = loader.load::<B::InnerBackend>(&indices, &self.device)?;
        let model = self.model.valid();
        let output = self.adapter.forward(&model, &batch)?;
        let rollout = self.aggregator.rollout(&output, &batch)?;
        VisualSnapshot::capture(split, epoch, &output, &batch, Some(&rollout), count)
    }

    /// Persist the current weights as an emergency checkpoint and fail the run.
    fn abort(&mut self, split: Split, epoch: usize, loss: f32) -> NeuralTerraError {
        self.state.phase = TrainerPhase::Failed;
        let step = self.state.step(split);
        log::error!(
            "Non-finite {} loss {} at epoch {}, step {}; writing emergency checkpoint",
            split,
            loss,
            epoch,
            step
        );
        let metadata = self.metadata(epoch, loss);
        if let Err(e) = save_checkpoint(
            &self.model,
            self.run.path(),
            CheckpointKind::Emergency,
            &metadata,
        ) {
            log::error!("Emergency checkpoint failed: {}", e);
        }
        NeuralTerraError::NonFiniteLoss {
            split: split.as_str(),
            epoch,
            step,
        }
    }
}
