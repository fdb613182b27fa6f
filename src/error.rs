//! Standard error enum and result type for this crate.

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to decode image: {0}")]
    Image(#[from] image::error::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("array shape mismatch: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// The patch sampler was handed a dataset built without a disparity
    /// directory.
    #[error("dataset sample carries no disparity map")]
    MissingDisparity,

    /// Exhausted the bounded retries without hitting a pixel whose disparity
    /// is positive and whose patches fit inside the image.
    #[error("no pixel with usable disparity found in the sampled images")]
    NoValidDisparity,
}
