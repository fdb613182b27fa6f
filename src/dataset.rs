//! Stereo pair datasets read from disk.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use ndarray::{s, Array2};

use crate::error::Result;

/// KITTI reference-frame marker: only `*_10.png` files name the frame the
/// ground-truth disparity refers to; `*_11.png` is the next frame in time.
const FRAME_MARKER: &str = "_10.png";

/// One dataset entry: a grayscale stereo pair in [0,1] and, when the dataset
/// was built with a disparity directory, the ground-truth disparity map.
#[derive(Clone, Debug)]
pub struct StereoSample {
    pub left: Array2<f32>,
    pub right: Array2<f32>,
    pub disparity: Option<Array2<f32>>,
}

/// An indexable source of stereo samples.
///
/// `Send + 'static` so a sampler over it can move into the fill thread.
pub trait StereoDataset: Send + 'static {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn get(&self, index: usize) -> Result<StereoSample>;
}

/// KITTI 2015 scene-flow layout: `image_2/` holds left frames, `image_3/`
/// right frames, plus an optional directory of 16-bit disparity PNGs
/// (`disp_noc_0` for the training split).
///
/// Files are matched by sorted filename listing, not by explicit
/// correspondence keys.
#[derive(Clone, Debug)]
pub struct KittiDataset {
    left_files: Vec<PathBuf>,
    right_files: Vec<PathBuf>,
    disparity_files: Option<Vec<PathBuf>>,
    downsample: u32,
}

impl KittiDataset {
    /// Index a dataset without ground truth (e.g. the testing split).
    pub fn new<P: AsRef<Path>>(image_dir: P) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let left_files = list_sorted(&image_dir.join("image_2"), FRAME_MARKER)?;
        let right_files = list_sorted(&image_dir.join("image_3"), FRAME_MARKER)?;
        assert_eq!(
            left_files.len(),
            right_files.len(),
            "left/right image counts differ"
        );
        Ok(Self {
            left_files,
            right_files,
            disparity_files: None,
            downsample: 1,
        })
    }

    /// Index a dataset together with its ground-truth disparity directory
    /// (e.g. the training split with `disp_noc_0`).
    pub fn with_disparities<P, Q>(image_dir: P, disparity_dir: Q) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let mut dataset = Self::new(image_dir)?;
        let disparity_files = list_sorted(disparity_dir.as_ref(), ".png")?;
        assert_eq!(
            dataset.left_files.len(),
            disparity_files.len(),
            "image/disparity file counts differ"
        );
        dataset.disparity_files = Some(disparity_files);
        Ok(dataset)
    }

    /// Downsample images by an integer factor; disparity maps are subsampled
    /// on the same grid and their values divided by the factor.
    pub fn downsample(mut self, factor: u32) -> Self {
        assert!(factor >= 1, "downsample factor must be at least 1");
        self.downsample = factor;
        self
    }

    fn load_gray(&self, path: &Path) -> Result<Array2<f32>> {
        let mut img = image::open(path)?;
        if self.downsample > 1 {
            let (w, h) = (
                img.width() / self.downsample,
                img.height() / self.downsample,
            );
            img = img.resize_exact(w, h, FilterType::Triangle);
        }
        let gray = img.to_luma8();
        let (w, h) = gray.dimensions();
        let pixels = gray.into_raw().iter().map(|&p| p as f32 / 255.0).collect();
        Ok(Array2::from_shape_vec((h as usize, w as usize), pixels)?)
    }

    fn load_disparity(&self, path: &Path) -> Result<Array2<f32>> {
        // KITTI disparity PNGs are 16-bit; value/256 = disparity, 0 = unknown.
        let raw = image::open(path)?.to_luma16();
        let (w, h) = raw.dimensions();
        let values = raw.into_raw().iter().map(|&v| v as f32 / 256.0).collect();
        let full = Array2::from_shape_vec((h as usize, w as usize), values)?;
        if self.downsample <= 1 {
            return Ok(full);
        }
        // Every f-th pixel, trimmed to the resized image dims; horizontal
        // offsets shrink with the image, so the values scale by 1/f as well.
        let f = self.downsample as usize;
        let (h2, w2) = (h as usize / f, w as usize / f);
        let sub = full.slice(s![..;f, ..;f]);
        Ok(sub.slice(s![..h2, ..w2]).map(|d| d / self.downsample as f32))
    }
}

impl StereoDataset for KittiDataset {
    fn len(&self) -> usize {
        self.left_files.len()
    }

    fn get(&self, index: usize) -> Result<StereoSample> {
        let left = self.load_gray(&self.left_files[index])?;
        let right = self.load_gray(&self.right_files[index])?;
        let disparity = match &self.disparity_files {
            Some(files) => Some(self.load_disparity(&files[index])?),
            None => None,
        };
        Ok(StereoSample {
            left,
            right,
            disparity,
        })
    }
}

/// All regular files in `dir` whose name ends with `suffix`, sorted by name.
fn list_sorted(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.ends_with(suffix))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}
