//! Model variants and per-variant input assembly.
//!
//! The variant is chosen once, from the configured model name, when the
//! adapter is built. After that every variant goes through the same
//! [`ModelAdapter::forward`]: only the assembly of encoder inputs from a
//! batch differs.

use std::fmt;
use std::str::FromStr;

use burn::prelude::*;
use terra_core::{BevGrid, Frustum};

use crate::config::TrainingConfig;
use crate::data::{ImageBatch, TerrainBatch};
use crate::error::{NeuralTerraError, Result};
use crate::nn::{ImageInputs, ModalityInputs, PointInputs, SplatIndex, TerrainModel, POINT_FEATURES};
use crate::terrain::TerrainOutput;
use crate::util::{float_tensor, index_tensor, to_vec};

/// Supported encoder variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelVariant {
    /// Lift-splat over camera images (`lss`).
    Image,
    /// Voxelized point cloud (`voxelnet`).
    Points,
    /// Camera and point cloud fused in BEV (`bevfusion`).
    Fused,
}

impl ModelVariant {
    /// Configuration name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Image => "lss",
            Self::Points => "voxelnet",
            Self::Fused => "bevfusion",
        }
    }

    /// Whether the variant consumes camera images.
    pub fn uses_images(&self) -> bool {
        matches!(self, Self::Image | Self::Fused)
    }

    /// Whether the variant consumes point clouds.
    pub fn uses_points(&self) -> bool {
        matches!(self, Self::Points | Self::Fused)
    }
}

impl FromStr for ModelVariant {
    type Err = NeuralTerraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lss" => Ok(Self::Image),
            "voxelnet" => Ok(Self::Points),
            "bevfusion" => Ok(Self::Fused),
            other => Err(NeuralTerraError::UnknownModel {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Turns batches into encoder inputs and runs the encoder.
#[derive(Debug, Clone)]
pub struct ModelAdapter {
    variant: ModelVariant,
    grid: BevGrid,
    frustum: Option<Frustum>,
    final_dim: [usize; 2],
}

impl ModelAdapter {
    /// Build the adapter for the configured variant.
    ///
    /// Fails on an unknown model name or inconsistent geometry.
    pub fn new(config: &TrainingConfig) -> Result<Self> {
        let variant: ModelVariant = config.model.parse()?;
        let grid = config.grid.bev_grid().map_err(NeuralTerraError::config)?;
        let final_dim = config.augmentation.final_dim;
        let frustum = if variant.uses_images() {
            Some(Frustum::new(
                final_dim,
                config.encoder.image.downsample(),
                config.grid.dbound,
            )?)
        } else {
            None
        };
        Ok(Self {
            variant,
            grid,
            frustum,
            final_dim,
        })
    }

    /// Selected variant.
    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Encoder grid.
    pub fn grid(&self) -> &BevGrid {
        &self.grid
    }

    /// Depth bins of the image frustum, if the variant uses images.
    pub fn depth_bins(&self) -> usize {
        self.frustum.as_ref().map_or(0, |f| f.depth_bins)
    }

    /// Initialize an encoder for this adapter.
    pub fn init_model<B: Backend>(&self, config: &TrainingConfig, device: &B::Device) -> TerrainModel<B> {
        TerrainModel::new(self.variant, &config.encoder, self.depth_bins().max(1), device)
    }

    /// Assemble the variant's inputs from a batch.
    pub fn assemble<B: Backend>(&self, batch: &TerrainBatch<B>) -> Result<ModalityInputs<B>> {
        self.assemble_sensors(batch.images.as_ref(), batch.points.as_ref())
    }

    /// Assemble the variant's inputs from raw sensor tensors.
    ///
    /// Inputs the variant does not use are ignored.
    pub fn assemble_sensors<B: Backend>(
        &self,
        images: Option<&ImageBatch<B>>,
        points: Option<&Tensor<B, 3>>,
    ) -> Result<ModalityInputs<B>> {
        let name = self.variant.name();
        let image = || {
            images
                .ok_or(NeuralTerraError::MissingInput {
                    field: "camera images",
                    variant: name,
                })
                .and_then(|images| self.image_inputs(images))
        };
        let points = || {
            points
                .ok_or(NeuralTerraError::MissingInput {
                    field: "point cloud",
                    variant: name,
                })
                .and_then(|points| self.point_inputs(points.clone()))
        };

        Ok(match self.variant {
            ModelVariant::Image => ModalityInputs::Image(image()?),
            ModelVariant::Points => ModalityInputs::Points(points()?),
            ModelVariant::Fused => ModalityInputs::Fused(image()?, points()?),
        })
    }

    /// Run the encoder on a batch.
    pub fn forward<B: Backend>(
        &self,
        model: &TerrainModel<B>,
        batch: &TerrainBatch<B>,
    ) -> Result<TerrainOutput<B>> {
        self.encode(model, batch.images.as_ref(), batch.points.as_ref())
    }

    /// Run the encoder on raw sensor tensors.
    pub fn encode<B: Backend>(
        &self,
        model: &TerrainModel<B>,
        images: Option<&ImageBatch<B>>,
        points: Option<&Tensor<B, 3>>,
    ) -> Result<TerrainOutput<B>> {
        let inputs = self.assemble_sensors(images, points)?;
        let batch_size = match &inputs {
            ModalityInputs::Image(img) | ModalityInputs::Fused(img, _) => img.splat.batch,
            ModalityInputs::Points(pts) => pts.splat.batch,
        };
        let output = model.forward(inputs).ok_or_else(|| {
            NeuralTerraError::config(format!(
                "model built as {} cannot consume {} inputs",
                model.variant(),
                self.variant
            ))
        })?;

        let (nx, ny) = self.grid.dims();
        let expected = [batch_size, 1, nx, ny];
        if !output.shapes_match() || output.dims() != expected {
            return Err(NeuralTerraError::ShapeMismatch {
                expected: expected.to_vec(),
                got: output.dims().to_vec(),
            });
        }
        Ok(output)
    }

    /// Final image size `[height, width]` the image branch expects.
    pub fn final_dim(&self) -> [usize; 2] {
        self.final_dim
    }

    fn image_inputs<B: Backend>(&self, batch: &ImageBatch<B>) -> Result<ImageInputs<B>> {
        let frustum = self
            .frustum
            .as_ref()
            .ok_or_else(|| NeuralTerraError::config("image inputs need a frustum"))?;
        let [bsz, ncams, channels, h, w] = batch.images.dims();
        if channels != 3 || [h, w] != self.final_dim {
            return Err(NeuralTerraError::ShapeMismatch {
                expected: vec![bsz, ncams, 3, self.final_dim[0], self.final_dim[1]],
                got: batch.images.dims().to_vec(),
            });
        }
        if batch.cameras.len() != bsz || batch.cameras.iter().any(|c| c.len() != ncams) {
            return Err(NeuralTerraError::InvalidData(
                "camera geometry does not match images".to_string(),
            ));
        }

        let per_camera = frustum.len();
        let ncells = self.grid.num_cells();
        let mut keep = Vec::new();
        let mut cells = Vec::new();
        for (b, cameras) in batch.cameras.iter().enumerate() {
            for (n, camera) in cameras.iter().enumerate() {
                let offset = (b * ncams + n) * per_camera;
                for (i, p) in camera.ego_points(frustum)?.into_iter().enumerate() {
                    if let Some(cell) = self.grid.cell_index(p) {
                        keep.push((offset + i) as i64);
                        cells.push((b * ncells + cell) as i64);
                    }
                }
            }
        }

        let device = batch.images.device();
        let (nx, ny) = self.grid.dims();
        let n = keep.len();
        Ok(ImageInputs {
            images: batch.images.clone().reshape([bsz * ncams, 3, h, w]),
            keep: index_tensor(keep, [n], &device),
            splat: SplatIndex {
                cells: index_tensor(cells, [n], &device),
                batch: bsz,
                nx,
                ny,
            },
        })
    }

    fn point_inputs<B: Backend>(&self, points: Tensor<B, 3>) -> Result<PointInputs<B>> {
        let [bsz, axes, max_points] = points.dims();
        if axes != 3 {
            return Err(NeuralTerraError::ShapeMismatch {
                expected: vec![bsz, 3, max_points],
                got: points.dims().to_vec(),
            });
        }
        let device = points.device();
        let coords = to_vec(points)?;
        let ncells = self.grid.num_cells();
        let (nx, ny) = self.grid.dims();

        let mut features = Vec::new();
        let mut cells = Vec::new();
        for b in 0..bsz {
            let base = b * 3 * max_points;
            for i in 0..max_points {
                let p = terra_core::Point3::new(
                    coords[base + i],
                    coords[base + max_points + i],
                    coords[base + 2 * max_points + i],
                );
                if let Some(cell) = self.grid.cell_index(p) {
                    let center = self.grid.cell_center(cell / ny, cell % ny);
                    features.extend_from_slice(&[p.x, p.y, p.z, p.x - center.x, p.y - center.y]);
                    cells.push((b * ncells + cell) as i64);
                }
            }
        }

        let n = cells.len();
        Ok(PointInputs {
            features: float_tensor(features, [n, POINT_FEATURES], &device),
            splat: SplatIndex {
                cells: index_tensor(cells, [n], &device),
                batch: bsz,
                nx,
                ny,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!("lss".parse::<ModelVariant>().unwrap(), ModelVariant::Image);
        assert_eq!("voxelnet".parse::<ModelVariant>().unwrap(), ModelVariant::Points);
        assert_eq!("bevfusion".parse::<ModelVariant>().unwrap(), ModelVariant::Fused);
        assert!(matches!(
            "pointpillars".parse::<ModelVariant>(),
            Err(NeuralTerraError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_variant_names_roundtrip() {
        for v in [ModelVariant::Image, ModelVariant::Points, ModelVariant::Fused] {
            assert_eq!(v.name().parse::<ModelVariant>().unwrap(), v);
            assert_eq!(v.to_string(), v.name());
        }
    }

    #[test]
    fn test_adapter_rejects_unknown_model() {
        let config = TrainingConfig::new("transformer".to_string());
        assert!(matches!(
            ModelAdapter::new(&config),
            Err(NeuralTerraError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_point_adapter_has_no_frustum() {
        let adapter = ModelAdapter::new(&TrainingConfig::new("voxelnet".to_string())).unwrap();
        assert_eq!(adapter.depth_bins(), 0);
        assert!(!adapter.variant().uses_images());
    }
}
