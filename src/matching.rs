//! Window-based stereo matching with a sum-of-absolute-differences cost.

use ndarray::{s, Array2, ArrayView2, Zip};

/// Surround an image with a zero border of `padding` pixels on every side.
pub fn pad(image: &ArrayView2<f32>, padding: usize) -> Array2<f32> {
    let (height, width) = image.dim();
    let mut padded = Array2::zeros((height + 2 * padding, width + 2 * padding));
    padded
        .slice_mut(s![padding..padding + height, padding..padding + width])
        .assign(image);
    padded
}

/// Dense disparity of a rectified pair via per-pixel scanline search.
///
/// For every left-image pixel the window around it is compared against
/// windows shifted 0..`max_disparity` columns to the left in the right image;
/// the shift with the smallest absolute-difference sum wins. Borders are
/// zero-padded so every pixel gets a full window.
pub fn sad_disparity(
    left: &ArrayView2<f32>,
    right: &ArrayView2<f32>,
    window_size: usize,
    max_disparity: usize,
) -> Array2<f32> {
    assert!(window_size % 2 == 1, "window size must be odd");
    assert_eq!(left.dim(), right.dim(), "stereo pair shapes differ");

    let (height, width) = left.dim();
    let padding = window_size / 2;
    let left_padded = pad(left, padding);
    let right_padded = pad(right, padding);

    let mut disparity = Array2::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let window = left_padded.slice(s![y..y + window_size, x..x + window_size]);
            disparity[[y, x]] =
                best_scanline_match(&window, &right_padded, x, y, max_disparity, window_size)
                    as f32;
        }
    }
    disparity
}

/// Disparity along one scanline minimizing SAD against `window`. Shifts that
/// would run off the left edge are skipped, ties keep the smaller disparity.
fn best_scanline_match(
    window: &ArrayView2<f32>,
    right_padded: &Array2<f32>,
    x: usize,
    y: usize,
    max_disparity: usize,
    window_size: usize,
) -> usize {
    let mut best_sad = f32::INFINITY;
    let mut best_disparity = 0;
    for d in 0..max_disparity {
        if d > x {
            break;
        }
        let shifted = x - d;
        let candidate = right_padded.slice(s![y..y + window_size, shifted..shifted + window_size]);
        let sad = Zip::from(window)
            .and(&candidate)
            .fold(0.0, |acc, a, b| acc + (a - b).abs());
        if sad < best_sad {
            best_sad = sad;
            best_disparity = d;
        }
    }
    best_disparity
}
