//! Deterministic (evaluation-time) image resize and crop.
//!
//! Images are scaled so the target crop fits, then cropped near the bottom
//! according to the mean of `bot_pct_lim` and centered horizontally. The
//! resulting image-plane transform is what [`crate::camera::CameraGeometry`]
//! undoes.

use crate::types::{Mat3, Point3};

/// Resize and crop applied to one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AugmentationParams {
    /// Uniform scale factor.
    pub resize: f32,
    /// Size after resizing as `[height, width]`.
    pub resize_dims: [usize; 2],
    /// Crop origin `(x, y)` in the resized image. May be negative when the
    /// resized image is smaller than the crop.
    pub crop_origin: [i64; 2],
    /// Final size as `[height, width]`.
    pub final_dim: [usize; 2],
}

impl AugmentationParams {
    /// Image-plane rotation and translation mapping source pixels to
    /// augmented pixels.
    pub fn post_transform(&self) -> (Mat3, Point3) {
        (
            Mat3::diagonal(self.resize, self.resize, 1.0),
            Point3::new(-self.crop_origin[0] as f32, -self.crop_origin[1] as f32, 0.0),
        )
    }
}

/// Evaluation-time augmentation for a `height x width` source image.
pub fn eval_augmentation(
    height: usize,
    width: usize,
    final_dim: [usize; 2],
    bot_pct_lim: [f32; 2],
) -> AugmentationParams {
    let [f_h, f_w] = final_dim;
    let resize = (f_h as f32 / height as f32).max(f_w as f32 / width as f32);
    let new_w = (width as f32 * resize) as usize;
    let new_h = (height as f32 * resize) as usize;
    let bot_pct = 0.5 * (bot_pct_lim[0] + bot_pct_lim[1]);
    let crop_h = ((1.0 - bot_pct) * new_h as f32) as i64 - f_h as i64;
    let crop_w = (new_w as i64 - f_w as i64).max(0) / 2;

    AugmentationParams {
        resize,
        resize_dims: [new_h, new_w],
        crop_origin: [crop_w, crop_h],
        final_dim,
    }
}
