//! Shared in-memory dataset for unit tests.

use ndarray::Array2;

use crate::dataset::{StereoDataset, StereoSample};
use crate::error::Result;

/// Synthetic stereo pairs where the right image is the left shifted `shift`
/// columns leftward, i.e. a constant ground-truth disparity of `shift`
/// wherever a correspondence exists. Pixel values encode their coordinates,
/// so patches cut at different columns never coincide.
#[derive(Clone)]
pub struct ShiftedDataset {
    pairs: usize,
    height: usize,
    width: usize,
    shift: usize,
    with_disparity: bool,
}

impl ShiftedDataset {
    pub fn new(pairs: usize, height: usize, width: usize, shift: usize) -> Self {
        Self {
            pairs,
            height,
            width,
            shift,
            with_disparity: true,
        }
    }

    /// Drop the disparity maps, like a dataset built without a ground-truth
    /// directory.
    pub fn without_disparity(mut self) -> Self {
        self.with_disparity = false;
        self
    }
}

impl StereoDataset for ShiftedDataset {
    fn len(&self) -> usize {
        self.pairs
    }

    fn get(&self, _index: usize) -> Result<StereoSample> {
        let (height, width, shift) = (self.height, self.width, self.shift);
        let left = Array2::from_shape_fn((height, width), |(y, x)| {
            (x * height + y) as f32 / (height * width) as f32
        });
        let right = Array2::from_shape_fn((height, width), |(y, x)| {
            let source = (x + shift).min(width - 1);
            (source * height + y) as f32 / (height * width) as f32
        });
        let disparity = self.with_disparity.then(|| {
            Array2::from_shape_fn((height, width), |(_, x)| {
                if shift > 0 && x >= shift {
                    shift as f32
                } else {
                    0.0
                }
            })
        });
        Ok(StereoSample {
            left,
            right,
            disparity,
        })
    }
}
