//! Rendering disparity maps as grayscale images.

use image::GrayImage;
use ndarray::ArrayView2;

/// Scale a disparity map into an 8-bit grayscale image.
///
/// Values map linearly so `max_disparity` lands on white; larger values
/// saturate and NaN renders black.
pub fn disparity_to_image(disparity: &ArrayView2<f32>, max_disparity: f32) -> Option<GrayImage> {
    assert!(max_disparity > 0.0, "max disparity must be positive");
    let (height, width) = disparity.dim();
    let pixels = disparity
        .iter()
        .map(|d| {
            if d.is_nan() {
                0
            } else {
                (d / max_disparity * 255.0).clamp(0.0, 255.0) as u8
            }
        })
        .collect();
    GrayImage::from_raw(width as u32, height as u32, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scales_clamps_and_zeroes_nan() {
        let disparity = array![[0.0, 25.0], [50.0, 120.0], [f32::NAN, -3.0]];
        let image = disparity_to_image(&disparity.view(), 50.0).unwrap();
        assert_eq!(image.dimensions(), (2, 3));
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(1, 0).0, [127]);
        assert_eq!(image.get_pixel(0, 1).0, [255]);
        assert_eq!(image.get_pixel(1, 1).0, [255]);
        assert_eq!(image.get_pixel(0, 2).0, [0]);
        assert_eq!(image.get_pixel(1, 2).0, [0]);
    }
}
