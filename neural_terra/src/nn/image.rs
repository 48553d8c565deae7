//! Lift-splat image branch.
//!
//! Each camera image passes through a strided convolutional backbone that
//! predicts, per feature-map pixel, a categorical depth distribution and a
//! context vector. Their outer product "lifts" the pixel into a column of
//! frustum samples, which are then summed into BEV cells.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{PaddingConfig2d, Relu};
use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::config::ImageEncoderConfig;

use super::splat::SplatIndex;

/// Image encoder producing BEV features.
#[derive(Module, Debug)]
pub struct ImageBranch<B: Backend> {
    backbone: Vec<Conv2d<B>>,
    depth: Conv2d<B>,
    context: Conv2d<B>,
    activation: Relu,
}

impl<B: Backend> ImageBranch<B> {
    /// Create the branch.
    pub fn new(
        config: &ImageEncoderConfig,
        depth_bins: usize,
        bev_channels: usize,
        device: &B::Device,
    ) -> Self {
        let mut backbone = Vec::new();
        let mut in_ch = 3;
        for &out_ch in &config.backbone_channels {
            backbone.push(
                Conv2dConfig::new([in_ch, out_ch], [3, 3])
                    .with_stride([2, 2])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device),
            );
            in_ch = out_ch;
        }

        Self {
            backbone,
            depth: Conv2dConfig::new([in_ch, depth_bins], [1, 1]).init(device),
            context: Conv2dConfig::new([in_ch, bev_channels], [1, 1]).init(device),
            activation: Relu::new(),
        }
    }

    /// Number of depth bins.
    pub fn depth_bins(&self) -> usize {
        self.depth.weight.dims()[0]
    }

    /// Output channels.
    pub fn channels(&self) -> usize {
        self.context.weight.dims()[0]
    }

    /// Lift every image to frustum features.
    ///
    /// Input: images `[batch * cameras, 3, H, W]`.
    /// Output: `[batch * cameras * h * w * depth_bins, channels]`, ordered
    /// camera, row, column, depth bin.
    pub fn lift(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for conv in &self.backbone {
            x = self.activation.forward(conv.forward(x));
        }

        let depth = softmax(self.depth.forward(x.clone()), 1);
        let context = self.context.forward(x);
        let [n, d, h, w] = depth.dims();
        let c = context.dims()[1];

        // [n, hw, d, 1] * [n, hw, 1, c] -> [n, hw, d, c]
        let depth = depth.reshape([n, d, h * w]).swap_dims(1, 2).unsqueeze_dim::<4>(3);
        let context = context.reshape([n, c, h * w]).swap_dims(1, 2).unsqueeze_dim::<4>(2);
        (depth * context).reshape([n * h * w * d, c])
    }

    /// Lift and splat into `[batch, channels, nx, ny]`.
    ///
    /// `keep` selects the lifted rows that fall inside the grid, in the same
    /// order as `splat.cells`.
    pub fn forward(
        &self,
        images: Tensor<B, 4>,
        keep: Tensor<B, 1, Int>,
        splat: &SplatIndex<B>,
    ) -> Tensor<B, 4> {
        if splat.is_empty() {
            return splat.zeros(self.channels(), &images.device());
        }
        let lifted = self.lift(images);
        splat.sum(lifted.select(0, keep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{index_tensor, to_vec};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn branch(device: &<TestBackend as Backend>::Device) -> ImageBranch<TestBackend> {
        let config = ImageEncoderConfig::new().with_backbone_channels(vec![4, 4]);
        ImageBranch::new(&config, 3, 5, device)
    }

    #[test]
    fn test_lift_shape() {
        let device = Default::default();
        let branch = branch(&device);
        let lifted = branch.lift(Tensor::zeros([2, 3, 16, 8], &device));
        // 16x8 / 4 = 4x2 feature map, 3 depth bins, 5 channels
        assert_eq!(lifted.dims(), [2 * 4 * 2 * 3, 5]);
    }

    #[test]
    fn test_depth_distribution_sums_to_context() {
        let device = Default::default();
        let branch = branch(&device);
        let images = Tensor::<TestBackend, 4>::random(
            [1, 3, 8, 8],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let lifted = branch.lift(images.clone());
        // Summing over depth bins recovers the context vector of each pixel.
        let per_pixel: Tensor<TestBackend, 3> = lifted.reshape([4, 3, 5]).sum_dim(1).squeeze::<2>(1).unsqueeze_dim(0);
        let mut x = images;
        for conv in &branch.backbone {
            x = branch.activation.forward(conv.forward(x));
        }
        let context = branch.context.forward(x).reshape([1, 5, 4]).swap_dims(1, 2);
        let diff = (per_pixel - context).abs().max();
        assert!(to_vec(diff).unwrap()[0] < 1e-5);
    }

    #[test]
    fn test_forward_grid_shape() {
        let device = Default::default();
        let branch = branch(&device);
        let splat = SplatIndex {
            cells: index_tensor(vec![0, 5, 5], [3], &device),
            batch: 1,
            nx: 3,
            ny: 2,
        };
        let keep = index_tensor(vec![0, 1, 2], [3], &device);
        let bev = branch.forward(Tensor::zeros([1, 3, 8, 8], &device), keep, &splat);
        assert_eq!(bev.dims(), [1, 5, 3, 2]);
    }
}
