//! Terrain head shared by every encoder variant.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{PaddingConfig2d, Relu};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use crate::terrain::TerrainOutput;

/// Maps BEV features to geometry, height difference and friction.
///
/// The terrain surface is the geometry minus a non-negative height
/// difference, so vegetation and other compliant cover can only lower it.
#[derive(Module, Debug)]
pub struct TerrainHead<B: Backend> {
    hidden: Conv2d<B>,
    out: Conv2d<B>,
    activation: Relu,
}

impl<B: Backend> TerrainHead<B> {
    /// Create the head.
    pub fn new(in_channels: usize, hidden_channels: usize, device: &B::Device) -> Self {
        Self {
            hidden: Conv2dConfig::new([in_channels, hidden_channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            out: Conv2dConfig::new([hidden_channels, 3], [1, 1]).init(device),
            activation: Relu::new(),
        }
    }

    /// Input: `[batch, channels, nx, ny]`.
    pub fn forward(&self, features: Tensor<B, 4>) -> TerrainOutput<B> {
        let x = self.activation.forward(self.hidden.forward(features));
        let x = self.out.forward(x);
        let [b, _, nx, ny] = x.dims();

        let geometry = x.clone().slice([0..b, 0..1, 0..nx, 0..ny]);
        // softplus
        let difference = x
            .clone()
            .slice([0..b, 1..2, 0..nx, 0..ny])
            .exp()
            .add_scalar(1.0)
            .log();
        let friction = sigmoid(x.slice([0..b, 2..3, 0..nx, 0..ny]));
        let terrain = geometry.clone() - difference.clone();

        TerrainOutput {
            geometry,
            terrain,
            friction,
            difference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::to_vec;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_head_ranges() {
        let device = Default::default();
        let head = TerrainHead::<TestBackend>::new(4, 8, &device);
        let features = Tensor::<TestBackend, 4>::random(
            [2, 4, 6, 6],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let out = head.forward(features);
        assert!(out.shapes_match());
        assert_eq!(out.geometry.dims(), [2, 1, 6, 6]);

        let friction = to_vec(out.friction).unwrap();
        assert!(friction.iter().all(|&f| (0.0..=1.0).contains(&f)));
        let diff = to_vec(out.difference).unwrap();
        assert!(diff.iter().all(|&d| d > 0.0));
    }
}
