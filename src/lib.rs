//! Stereo patch batches for metric-learning disparity training.
//!
//! [`KittiDataset`] indexes matching left/right frames (and optional
//! ground-truth disparity maps) on disk; [`PatchProvider`] keeps a ring
//! buffer of randomly sampled (reference, positive, negative) patch triples
//! filled from a background thread and serves them as batches, down to
//! candle tensors.

pub mod dataset;
pub mod error;
pub mod matching;
pub mod provider;
pub mod sampler;
pub mod visualize;

pub use crate::dataset::{KittiDataset, StereoDataset, StereoSample};
pub use crate::error::{Error, Result};
pub use crate::matching::{pad, sad_disparity};
pub use crate::provider::{Batches, PatchBatch, PatchProvider, PatchProviderConfig};
pub use crate::sampler::{PatchPlacement, PatchSampler, PatchTriple};
pub use crate::visualize::disparity_to_image;

#[cfg(test)]
mod testutil;
