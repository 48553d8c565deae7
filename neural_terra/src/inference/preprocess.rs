use terra_core::{eval_augmentation, AugmentationParams, Mat3, Point3};

use crate::error::{NeuralTerraError, Result};

/// ImageNet channel means.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Network-ready image with the transform that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    /// Normalized `[3, H, W]` values.
    pub data: Vec<f32>,
    /// `[H, W]`.
    pub size: [usize; 2],
    /// Image-plane rotation of the resize.
    pub post_rotation: Mat3,
    /// Image-plane translation of the crop.
    pub post_translation: Point3,
}

fn bilinear(rgb: &[u8], height: usize, width: usize, y: f32, x: f32, channel: usize) -> f32 {
    let y = y.clamp(0.0, (height - 1) as f32);
    let x = x.clamp(0.0, (width - 1) as f32);
    let (y0, x0) = (y.floor() as usize, x.floor() as usize);
    let (y1, x1) = ((y0 + 1).min(height - 1), (x0 + 1).min(width - 1));
    let (fy, fx) = (y - y0 as f32, x - x0 as f32);
    let at = |r: usize, c: usize| rgb[(r * width + c) * 3 + channel] as f32;
    at(y0, x0) * (1.0 - fy) * (1.0 - fx)
        + at(y0, x1) * (1.0 - fy) * fx
        + at(y1, x0) * fy * (1.0 - fx)
        + at(y1, x1) * fy * fx
}

/// Apply an already computed resize and crop to an RGB image.
///
/// `rgb` is row-major `height x width x 3`. Crop regions outside the resized
/// image are black before normalization.
pub fn apply_augmentation(
    rgb: &[u8],
    height: usize,
    width: usize,
    params: &AugmentationParams,
) -> Result<PreparedImage> {
    if height == 0 || width == 0 || rgb.len() != height * width * 3 {
        return Err(NeuralTerraError::InvalidData(format!(
            "expected {}x{} RGB image, got {} bytes",
            height,
            width,
            rgb.len()
        )));
    }
    let [out_h, out_w] = params.final_dim;
    let [resized_h, resized_w] = params.resize_dims;
    let [crop_x, crop_y] = params.crop_origin;

    let mut data = vec![0.0; 3 * out_h * out_w];
    for r in 0..out_h {
        let ry = r as i64 + crop_y;
        for c in 0..out_w {
            let rx = c as i64 + crop_x;
            let inside = ry >= 0 && rx >= 0 && (ry as usize) < resized_h && (rx as usize) < resized_w;
            for ch in 0..3 {
                let value = if inside {
                    let sy = (ry as f32 + 0.5) / params.resize - 0.5;
                    let sx = (rx as f32 + 0.5) / params.resize - 0.5;
                    bilinear(rgb, height, width, sy, sx, ch) / 255.0
                } else {
                    0.0
                };
                data[(ch * out_h + r) * out_w + c] = (value - IMAGENET_MEAN[ch]) / IMAGENET_STD[ch];
            }
        }
    }

    let (post_rotation, post_translation) = params.post_transform();
    Ok(PreparedImage {
        data,
        size: [out_h, out_w],
        post_rotation,
        post_translation,
    })
}

/// Evaluation-time resize, crop and normalization of an RGB image.
pub fn preprocess_image(
    rgb: &[u8],
    height: usize,
    width: usize,
    final_dim: [usize; 2],
    bot_pct_lim: [f32; 2],
) -> Result<PreparedImage> {
    let params = eval_augmentation(height, width, final_dim, bot_pct_lim);
    apply_augmentation(rgb, height, width, &params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_image_normalization() {
        let rgb = vec![255u8; 8 * 16 * 3];
        let image = preprocess_image(&rgb, 8, 16, [4, 8], [0.0, 0.0]).unwrap();
        assert_eq!(image.size, [4, 8]);
        assert_eq!(image.data.len(), 3 * 4 * 8);
        for ch in 0..3 {
            let expected = (1.0 - IMAGENET_MEAN[ch]) / IMAGENET_STD[ch];
            let v = image.data[ch * 32 + 5];
            assert!((v - expected).abs() < 1e-5, "{} vs {}", v, expected);
        }
        assert_eq!(image.post_rotation.rows[0][0], 0.5);
    }

    #[test]
    fn test_out_of_image_crop_is_black() {
        let rgb = vec![255u8; 4 * 4 * 3];
        let params = AugmentationParams {
            resize: 1.0,
            resize_dims: [4, 4],
            crop_origin: [0, -2],
            final_dim: [4, 4],
        };
        let image = apply_augmentation(&rgb, 4, 4, &params).unwrap();
        let black = -IMAGENET_MEAN[0] / IMAGENET_STD[0];
        assert!((image.data[0] - black).abs() < 1e-6);
        assert!((image.data[3 * 4] - (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0]).abs() < 1e-5);
        assert_eq!(image.post_translation.y, 2.0);
    }

    #[test]
    fn test_size_mismatch() {
        assert!(preprocess_image(&[0u8; 10], 2, 2, [2, 2], [0.0, 0.0]).is_err());
    }
}
