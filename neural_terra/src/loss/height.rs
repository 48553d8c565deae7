use burn::prelude::*;

use crate::bridge::curvature_penalty;

/// Mean squared error weighted by `mask`.
///
/// Cells with a zero weight do not contribute, even when their label is NaN.
/// A NaN label under a positive weight propagates to the result. An all-zero
/// mask gives zero.
pub fn masked_mse<B: Backend, const D: usize>(
    prediction: Tensor<B, D>,
    label: Tensor<B, D>,
    mask: Tensor<B, D>,
) -> Tensor<B, 1> {
    let weight = mask.clamp_min(0.0);
    let ignored = weight.clone().lower_equal_elem(0.0);
    let diff = (prediction - label).mask_fill(ignored, 0.0);
    let weighted = diff.clone() * diff * weight.clone();
    weighted.sum() / weight.sum().clamp_min(1e-6)
}

/// Masked height error plus a scaled curvature penalty on the prediction.
pub fn height_map_loss<B: Backend>(
    prediction: Tensor<B, 4>,
    label: Tensor<B, 4>,
    mask: Tensor<B, 4>,
    curvature_weight: f32,
) -> Tensor<B, 1> {
    let error = masked_mse(prediction.clone(), label, mask);
    if curvature_weight > 0.0 {
        error + curvature_penalty(prediction).mul_scalar(curvature_weight)
    } else {
        error
    }
}
