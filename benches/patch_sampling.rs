use std::time::Instant;

use criterion::black_box;
use indicatif::ProgressBar;
use ndarray::Array2;
use stereo_batch_provider::{
    PatchProvider, PatchProviderConfig, PatchSampler, Result, StereoDataset, StereoSample,
};

/// KITTI-sized synthetic pairs, right image shifted by a constant disparity.
#[derive(Clone)]
struct ShiftedPairs {
    pairs: usize,
    height: usize,
    width: usize,
    shift: usize,
}

impl StereoDataset for ShiftedPairs {
    fn len(&self) -> usize {
        self.pairs
    }

    fn get(&self, index: usize) -> Result<StereoSample> {
        let level = |y: usize, x: usize| ((x * 13 + y * 7 + index) % 29) as f32 / 29.0;
        let left = Array2::from_shape_fn((self.height, self.width), |(y, x)| level(y, x));
        let right = Array2::from_shape_fn((self.height, self.width), |(y, x)| {
            level(y, (x + self.shift).min(self.width - 1))
        });
        let disparity = Array2::from_shape_fn((self.height, self.width), |(_, x)| {
            if x >= self.shift {
                self.shift as f32
            } else {
                0.0
            }
        });
        Ok(StereoSample {
            left,
            right,
            disparity: Some(disparity),
        })
    }
}

fn kitti_sized() -> ShiftedPairs {
    ShiftedPairs {
        pairs: 8,
        height: 376,
        width: 1240,
        shift: 40,
    }
}

fn sampler_bench() {
    let mut sampler = PatchSampler::new(kitti_sized(), 9, (4, 10), Some(1));
    let rounds = 2_000u64;
    let pb = ProgressBar::new(rounds);
    let start = Instant::now();
    for _ in 0..rounds {
        black_box(sampler.sample().unwrap());
        pb.inc(1);
    }
    let elapsed = start.elapsed();
    pb.finish();
    println!(
        "sampler: {} triples in {:?} ({:.0} triples/s)",
        rounds,
        elapsed,
        rounds as f64 / elapsed.as_secs_f64()
    );
}

fn provider_bench() {
    let config = PatchProviderConfig::default()
        .capacity(4096)
        .batch_size(128)
        .seed(1);
    let mut provider = PatchProvider::new(kitti_sized(), config);
    let mut batches = provider.batches();

    let start = Instant::now();
    let first = batches.next().unwrap();
    println!("fill: 4096 slots ready in {:?}", start.elapsed());
    black_box(first);

    let rounds = 200u64;
    let start = Instant::now();
    for _ in 0..rounds {
        black_box(batches.next().unwrap());
    }
    let elapsed = start.elapsed();
    println!(
        "batches: {} x 128 triples in {:?} ({:.0} batches/s)",
        rounds,
        elapsed,
        rounds as f64 / elapsed.as_secs_f64()
    );
    provider.stop();
}

fn main() {
    sampler_bench();
    provider_bench();
}
