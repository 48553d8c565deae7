//! Terrain encoder module.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{PaddingConfig2d, Relu};
use burn::prelude::*;

use crate::adapter::ModelVariant;
use crate::config::EncoderConfig;
use crate::terrain::TerrainOutput;

use super::head::TerrainHead;
use super::image::ImageBranch;
use super::point::PointBranch;
use super::splat::SplatIndex;

/// Camera inputs prepared for the image branch.
#[derive(Debug, Clone)]
pub struct ImageInputs<B: Backend> {
    /// Images `[batch * cameras, 3, H, W]`.
    pub images: Tensor<B, 4>,
    /// Lifted rows that fall inside the grid.
    pub keep: Tensor<B, 1, Int>,
    /// Cell of each kept row.
    pub splat: SplatIndex<B>,
}

/// Point inputs prepared for the point branch.
#[derive(Debug, Clone)]
pub struct PointInputs<B: Backend> {
    /// Features of points inside the grid `[points, POINT_FEATURES]`.
    pub features: Tensor<B, 2>,
    /// Cell of each point.
    pub splat: SplatIndex<B>,
}

/// Variant-specific encoder inputs.
#[derive(Debug, Clone)]
pub enum ModalityInputs<B: Backend> {
    /// Lift-splat over camera images.
    Image(ImageInputs<B>),
    /// Point cloud.
    Points(PointInputs<B>),
    /// Both, fused in BEV.
    Fused(ImageInputs<B>, PointInputs<B>),
}

/// Terrain encoder: modality branches, optional fusion, shared head.
#[derive(Module, Debug)]
pub struct TerrainModel<B: Backend> {
    image: Option<ImageBranch<B>>,
    points: Option<PointBranch<B>>,
    fuse: Option<Conv2d<B>>,
    head: TerrainHead<B>,
    activation: Relu,
}

impl<B: Backend> TerrainModel<B> {
    /// Build the branches `variant` needs.
    pub fn new(
        variant: ModelVariant,
        config: &EncoderConfig,
        depth_bins: usize,
        device: &B::Device,
    ) -> Self {
        let c = config.bev_channels;
        let image = matches!(variant, ModelVariant::Image | ModelVariant::Fused)
            .then(|| ImageBranch::new(&config.image, depth_bins, c, device));
        let points = matches!(variant, ModelVariant::Points | ModelVariant::Fused)
            .then(|| PointBranch::new(&config.points, c, device));
        let fuse = matches!(variant, ModelVariant::Fused).then(|| {
            Conv2dConfig::new([2 * c, c], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        });

        Self {
            image,
            points,
            fuse,
            head: TerrainHead::new(c, config.head_channels, device),
            activation: Relu::new(),
        }
    }

    /// Variant implied by the branches present.
    pub fn variant(&self) -> ModelVariant {
        match (&self.image, &self.points) {
            (Some(_), Some(_)) => ModelVariant::Fused,
            (None, Some(_)) => ModelVariant::Points,
            _ => ModelVariant::Image,
        }
    }

    /// Encode prepared inputs.
    ///
    /// Returns `None` when `inputs` belong to a different variant than the
    /// one this model was built for.
    pub fn forward(&self, inputs: ModalityInputs<B>) -> Option<TerrainOutput<B>> {
        let features = match inputs {
            ModalityInputs::Image(img) => {
                let branch = self.image.as_ref()?;
                if self.points.is_some() {
                    return None;
                }
                branch.forward(img.images, img.keep, &img.splat)
            }
            ModalityInputs::Points(pts) => {
                let branch = self.points.as_ref()?;
                if self.image.is_some() {
                    return None;
                }
                branch.forward(pts.features, &pts.splat)
            }
            ModalityInputs::Fused(img, pts) => {
                let image_bev = self.image.as_ref()?.forward(img.images, img.keep, &img.splat);
                let point_bev = self.points.as_ref()?.forward(pts.features, &pts.splat);
                let fused = Tensor::cat(vec![image_bev, point_bev], 1);
                self.activation.forward(self.fuse.as_ref()?.forward(fused))
            }
        };
        Some(self.head.forward(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_variant_branches() {
        let device = Default::default();
        let config = EncoderConfig::tiny();
        for variant in [ModelVariant::Image, ModelVariant::Points, ModelVariant::Fused] {
            let model = TerrainModel::<TestBackend>::new(variant, &config, 4, &device);
            assert_eq!(model.variant(), variant);
        }
    }

    #[test]
    fn test_wrong_inputs_rejected() {
        let device = Default::default();
        let model = TerrainModel::<TestBackend>::new(ModelVariant::Image, &EncoderConfig::tiny(), 4, &device);
        let splat = SplatIndex {
            cells: crate::util::index_tensor(vec![0], [1], &device),
            batch: 1,
            nx: 2,
            ny: 2,
        };
        let inputs = ModalityInputs::Points(PointInputs {
            features: Tensor::zeros([1, super::super::POINT_FEATURES], &device),
            splat,
        });
        assert!(model.forward(inputs).is_none());
    }
}
