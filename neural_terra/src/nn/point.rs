//! Point-cloud branch.
//!
//! A shared per-point MLP embeds each point together with its offset from
//! the center of the BEV cell it falls in. Embeddings are averaged per cell
//! and refined by a few 3x3 convolutions.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{PaddingConfig2d, Relu};
use burn::prelude::*;

use crate::config::PointEncoderConfig;

use super::mlp::{Mlp, MlpConfig};
use super::splat::SplatIndex;

/// Per-point input features: `x, y, z, dx, dy` with `(dx, dy)` the offset
/// from the cell center.
pub const POINT_FEATURES: usize = 5;

/// Point encoder producing BEV features.
#[derive(Module, Debug)]
pub struct PointBranch<B: Backend> {
    mlp: Mlp<B>,
    bev_convs: Vec<Conv2d<B>>,
    activation: Relu,
}

impl<B: Backend> PointBranch<B> {
    /// Create the branch.
    pub fn new(config: &PointEncoderConfig, bev_channels: usize, device: &B::Device) -> Self {
        let mlp = MlpConfig::new(POINT_FEATURES, bev_channels)
            .with_hidden_dims(config.hidden_dims.clone())
            .with_final_activation(true)
            .init(device);
        let bev_convs = (0..config.bev_layers)
            .map(|_| {
                Conv2dConfig::new([bev_channels, bev_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device)
            })
            .collect();

        Self {
            mlp,
            bev_convs,
            activation: Relu::new(),
        }
    }

    /// Output channels.
    pub fn channels(&self) -> usize {
        self.mlp.output_dim()
    }

    /// Encode points `[points, POINT_FEATURES]` landing in `splat.cells`.
    ///
    /// Output: `[batch, channels, nx, ny]`.
    pub fn forward(&self, features: Tensor<B, 2>, splat: &SplatIndex<B>) -> Tensor<B, 4> {
        let mut bev = if splat.is_empty() {
            splat.zeros(self.channels(), &features.device())
        } else {
            splat.mean(self.mlp.forward(features))
        };
        for conv in &self.bev_convs {
            bev = self.activation.forward(conv.forward(bev));
        }
        bev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{float_tensor, index_tensor, to_vec};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_point_branch_shape() {
        let device = Default::default();
        let config = PointEncoderConfig::new().with_hidden_dims(vec![8]);
        let branch = PointBranch::<TestBackend>::new(&config, 6, &device);
        let splat = SplatIndex {
            cells: index_tensor(vec![0, 3, 7], [3], &device),
            batch: 2,
            nx: 2,
            ny: 2,
        };
        let bev = branch.forward(Tensor::ones([3, POINT_FEATURES], &device), &splat);
        assert_eq!(bev.dims(), [2, 6, 2, 2]);
    }

    #[test]
    fn test_duplicate_points_do_not_change_cell() {
        let device = Default::default();
        let config = PointEncoderConfig::new().with_bev_layers(0);
        let branch = PointBranch::<TestBackend>::new(&config, 4, &device);
        let point = vec![0.3, -0.2, 0.1, 0.05, 0.05];

        let single = SplatIndex {
            cells: index_tensor(vec![2], [1], &device),
            batch: 1,
            nx: 2,
            ny: 2,
        };
        let doubled = SplatIndex {
            cells: index_tensor(vec![2, 2], [2], &device),
            ..single.clone()
        };
        let one = branch.forward(float_tensor(point.clone(), [1, POINT_FEATURES], &device), &single);
        let two = branch.forward(
            float_tensor([point.clone(), point].concat(), [2, POINT_FEATURES], &device),
            &doubled,
        );
        let diff = to_vec((one - two).abs().max()).unwrap()[0];
        assert!(diff < 1e-6);
    }
}
