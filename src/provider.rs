//! Background-filled patch buffer serving random training batches.
//!
//! One worker thread keeps overwriting a fixed ring of patch triples while
//! consumers draw random subsets of the ring as batches. A single mutex
//! guards the ring; the worker holds it only while copying one triple in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use candle_core::{Device, Tensor};
use log::{debug, error};
use ndarray::{s, Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dataset::StereoDataset;
use crate::sampler::PatchSampler;

/// Poll interval while waiting for the ring to fill.
const FILL_POLL: Duration = Duration::from_millis(25);

/// Knobs for [`PatchProvider`]. Defaults follow common patch-similarity
/// training setups: 9x9 patches, an 8192-slot ring, 128-triple batches and
/// negative centers 4 to 10 columns off the true match.
#[derive(Clone, Copy, Debug)]
pub struct PatchProviderConfig {
    pub patch_size: usize,
    pub capacity: usize,
    pub batch_size: usize,
    pub negative_range: (usize, usize),
    pub seed: Option<u64>,
}

impl Default for PatchProviderConfig {
    fn default() -> Self {
        Self {
            patch_size: 9,
            capacity: 8192,
            batch_size: 128,
            negative_range: (4, 10),
            seed: None,
        }
    }
}

impl PatchProviderConfig {
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.patch_size = patch_size;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn negative_range(mut self, range: (usize, usize)) -> Self {
        self.negative_range = range;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// The ring itself: one (slots, h, w) stack per patch role, plus a counter of
/// completed writes so consumers can tell when every slot holds real data.
struct Slots {
    reference: Array3<f32>,
    positive: Array3<f32>,
    negative: Array3<f32>,
    writes: u64,
}

struct Shared {
    slots: Mutex<Slots>,
    running: AtomicBool,
}

/// A batch of patch triples, stacked along axis 0.
#[derive(Clone, Debug)]
pub struct PatchBatch {
    pub reference: Array3<f32>,
    pub positive: Array3<f32>,
    pub negative: Array3<f32>,
}

impl PatchBatch {
    pub fn len(&self) -> usize {
        self.reference.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the batch onto a device as three (n, 1, h, w) tensors, ready for
    /// a convolutional tower.
    pub fn to_tensors(&self, device: &Device) -> candle_core::Result<(Tensor, Tensor, Tensor)> {
        let upload = |array: &Array3<f32>| {
            let (n, h, w) = array.dim();
            let data: Vec<f32> = array.iter().copied().collect();
            Tensor::from_vec(data, (n, 1, h, w), device)
        };
        Ok((
            upload(&self.reference)?,
            upload(&self.positive)?,
            upload(&self.negative)?,
        ))
    }
}

/// Owns the ring and the fill worker. [`PatchProvider::batches`] starts the
/// worker and hands back an iterator of random batches.
pub struct PatchProvider<D: StereoDataset> {
    shared: Arc<Shared>,
    sampler: Option<PatchSampler<D>>,
    worker: Option<JoinHandle<()>>,
    config: PatchProviderConfig,
}

impl<D: StereoDataset> PatchProvider<D> {
    pub fn new(dataset: D, config: PatchProviderConfig) -> Self {
        assert!(config.capacity >= 1, "capacity must be at least one slot");
        assert!(
            (1..=config.capacity).contains(&config.batch_size),
            "batch size must lie in 1..=capacity"
        );
        let sampler = PatchSampler::new(
            dataset,
            config.patch_size,
            config.negative_range,
            config.seed,
        );
        let shape = (config.capacity, config.patch_size, config.patch_size);
        let shared = Arc::new(Shared {
            slots: Mutex::new(Slots {
                reference: Array3::zeros(shape),
                positive: Array3::zeros(shape),
                negative: Array3::zeros(shape),
                writes: 0,
            }),
            running: AtomicBool::new(false),
        });
        Self {
            shared,
            sampler: Some(sampler),
            worker: None,
            config,
        }
    }

    /// Completed slot writes so far, monotonically increasing.
    pub fn fill_count(&self) -> u64 {
        self.shared.slots.lock().unwrap().writes
    }

    /// Whether the fill worker is still overwriting slots.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    /// Start the fill worker (on the first call) and iterate random batches.
    ///
    /// The first `next` blocks until every slot has been written once, so
    /// batches never carry zero-initialized slots.
    pub fn batches(&mut self) -> Batches {
        if let Some(sampler) = self.sampler.take() {
            self.worker = Some(self.spawn_worker(sampler));
        }
        let rng = match self.config.seed {
            // decorrelate batch-subset draws from the sampler stream
            Some(seed) => StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
            None => StdRng::from_entropy(),
        };
        Batches {
            shared: Arc::clone(&self.shared),
            capacity: self.config.capacity,
            batch_size: self.config.batch_size,
            rng,
            primed: false,
        }
    }

    /// Ask the worker to stop after its current triple. Does not wait for it;
    /// dropping the provider joins the thread.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
    }

    fn spawn_worker(&self, mut sampler: PatchSampler<D>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let capacity = self.config.capacity;
        // raise the flag before the thread runs so a stop() issued right
        // after batches() is never overwritten
        shared.running.store(true, Ordering::Relaxed);
        thread::Builder::new()
            .name("patch-fill".into())
            .spawn(move || {
                debug!("fill worker started ({capacity} slots)");
                let mut slot = 0;
                while shared.running.load(Ordering::Relaxed) {
                    // sample outside the lock, it loads a full image pair
                    let triple = match sampler.sample() {
                        Ok(triple) => triple,
                        Err(err) => {
                            error!("patch sampling failed, stopping fill worker: {err}");
                            break;
                        }
                    };
                    let mut slots = shared.slots.lock().unwrap();
                    slots
                        .reference
                        .slice_mut(s![slot, .., ..])
                        .assign(&triple.reference);
                    slots
                        .positive
                        .slice_mut(s![slot, .., ..])
                        .assign(&triple.positive);
                    slots
                        .negative
                        .slice_mut(s![slot, .., ..])
                        .assign(&triple.negative);
                    slots.writes += 1;
                    drop(slots);
                    slot = (slot + 1) % capacity;
                }
                shared.running.store(false, Ordering::Relaxed);
                debug!("fill worker exited");
            })
            .expect("failed to spawn patch fill worker")
    }
}

impl<D: StereoDataset> Drop for PatchProvider<D> {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Iterator of random [`PatchBatch`]es over a filled ring.
///
/// Yields `None` once the worker has stopped before the ring ever filled;
/// after that point the ring holds stable data and batches keep coming.
pub struct Batches {
    shared: Arc<Shared>,
    capacity: usize,
    batch_size: usize,
    rng: StdRng,
    primed: bool,
}

impl Batches {
    fn wait_until_full(&self) -> bool {
        loop {
            if self.shared.slots.lock().unwrap().writes >= self.capacity as u64 {
                return true;
            }
            if !self.shared.running.load(Ordering::Relaxed) {
                return false;
            }
            thread::sleep(FILL_POLL);
        }
    }
}

impl Iterator for Batches {
    type Item = PatchBatch;

    fn next(&mut self) -> Option<PatchBatch> {
        if !self.primed {
            if !self.wait_until_full() {
                return None;
            }
            self.primed = true;
        }
        let indices =
            rand::seq::index::sample(&mut self.rng, self.capacity, self.batch_size).into_vec();
        let slots = self.shared.slots.lock().unwrap();
        Some(PatchBatch {
            reference: slots.reference.select(Axis(0), &indices),
            positive: slots.positive.select(Axis(0), &indices),
            negative: slots.negative.select(Axis(0), &indices),
        })
    }
}
