//! Random patch-triple sampling over a stereo dataset.

use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::{StereoDataset, StereoSample};
use crate::error::{Error, Result};

/// Pixel draws per image before moving on to another one.
const PIXEL_TRIES: usize = 256;
/// Image draws per `sample` call before giving up.
const IMAGE_TRIES: usize = 16;

/// Where a triple was cut from. Row and columns are patch centers.
#[derive(Clone, Copy, Debug)]
pub struct PatchPlacement {
    /// Dataset index of the image pair.
    pub image: usize,
    /// Center row, shared by all three patches.
    pub row: usize,
    /// Reference center column in the left image.
    pub col: usize,
    /// Ground-truth disparity at (row, col).
    pub disparity: f32,
    /// Positive center column in the right image: `col - round(disparity)`.
    pub positive_col: usize,
    /// Negative center column in the right image.
    pub negative_col: usize,
}

/// A reference/positive/negative patch triple of identical spatial size.
#[derive(Clone, Debug)]
pub struct PatchTriple {
    pub reference: Array2<f32>,
    pub positive: Array2<f32>,
    pub negative: Array2<f32>,
    pub placement: PatchPlacement,
}

/// Draws patch triples from random pixels with valid disparity, keeping every
/// patch inside the image.
pub struct PatchSampler<D> {
    dataset: D,
    patch_size: usize,
    negative_range: (usize, usize),
    rng: StdRng,
}

impl<D: StereoDataset> PatchSampler<D> {
    /// `negative_range` bounds |offset| of the negative center from the
    /// positive one, inclusive on both ends.
    pub fn new(
        dataset: D,
        patch_size: usize,
        negative_range: (usize, usize),
        seed: Option<u64>,
    ) -> Self {
        assert!(patch_size % 2 == 1, "patch size must be odd");
        assert!(!dataset.is_empty(), "dataset has no image pairs");
        let (lo, hi) = negative_range;
        assert!(
            (1..=hi).contains(&lo),
            "negative offset range must satisfy 1 <= min <= max"
        );
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            dataset,
            patch_size,
            negative_range,
            rng,
        }
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Draw one patch triple from a random image pair.
    ///
    /// Loads the pair from the dataset, then rejects pixels until one has
    /// positive disparity, sits far enough from every border, and leaves room
    /// for the positive and negative patches.
    pub fn sample(&mut self) -> Result<PatchTriple> {
        let half = self.patch_size / 2;
        for _ in 0..IMAGE_TRIES {
            let image = self.rng.gen_range(0..self.dataset.len());
            let sample = self.dataset.get(image)?;
            let disparity = sample.disparity.as_ref().ok_or(Error::MissingDisparity)?;

            let (rows, cols) = disparity.dim();
            if rows < self.patch_size || cols < self.patch_size {
                continue;
            }
            for _ in 0..PIXEL_TRIES {
                let row = self.rng.gen_range(half..rows - half);
                let col = self.rng.gen_range(half..cols - half);
                let d = disparity[[row, col]];
                if d <= 0.0 {
                    continue;
                }
                let positive_col = col as isize - d.round() as isize;
                if positive_col < half as isize {
                    continue;
                }
                let positive_col = positive_col as usize;
                if !self.negative_fits(positive_col, cols) {
                    continue;
                }
                let negative_col = self.draw_negative_col(positive_col, cols);
                let placement = PatchPlacement {
                    image,
                    row,
                    col,
                    disparity: d,
                    positive_col,
                    negative_col,
                };
                return Ok(self.cut(&sample, placement));
            }
        }
        Err(Error::NoValidDisparity)
    }

    /// An offset of at least the configured minimum fits on one side.
    fn negative_fits(&self, positive_col: usize, cols: usize) -> bool {
        let half = self.patch_size / 2;
        let (lo, _) = self.negative_range;
        positive_col >= half + lo || positive_col + lo < cols - half
    }

    /// Column at a random offset from the positive center, |offset| inside
    /// `negative_range`, sign randomized, resampled while the patch would
    /// leave the image. Never equals the positive column since the minimum
    /// offset is at least one.
    fn draw_negative_col(&mut self, positive_col: usize, cols: usize) -> usize {
        let half = self.patch_size / 2;
        let (lo, hi) = self.negative_range;
        loop {
            let magnitude = self.rng.gen_range(lo..=hi) as isize;
            let offset = if self.rng.gen_bool(0.5) {
                magnitude
            } else {
                -magnitude
            };
            let candidate = positive_col as isize + offset;
            if candidate >= half as isize && (candidate as usize) + half < cols {
                return candidate as usize;
            }
        }
    }

    fn cut(&self, sample: &StereoSample, placement: PatchPlacement) -> PatchTriple {
        let half = self.patch_size / 2;
        let PatchPlacement {
            row,
            col,
            positive_col,
            negative_col,
            ..
        } = placement;
        let window = |image: &Array2<f32>, center: usize| {
            image
                .slice(s![row - half..=row + half, center - half..=center + half])
                .to_owned()
        };
        PatchTriple {
            reference: window(&sample.left, col),
            positive: window(&sample.right, positive_col),
            negative: window(&sample.right, negative_col),
            placement,
        }
    }
}
