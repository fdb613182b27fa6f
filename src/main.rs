use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::ProgressBar;
use log::{info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use stereo_batch_provider::{disparity_to_image, sad_disparity, KittiDataset, StereoDataset};

/// Compute dense disparity maps for a KITTI 2015 testing split and write
/// them out as grayscale images.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Root of the KITTI subset, containing data_scene_flow/testing
    #[arg(long, default_value = "./KITTI_2015_subset")]
    input_dir: PathBuf,

    /// Where the rendered disparity maps go
    #[arg(long, default_value = "./output/handcrafted_stereo")]
    output_dir: PathBuf,

    /// Side length of the odd matching window
    #[arg(long, default_value_t = 3)]
    window_size: usize,

    /// Scanline search range in pixels
    #[arg(long, default_value_t = 50)]
    max_disparity: usize,

    /// Shrink images by this factor before matching
    #[arg(long, default_value_t = 1)]
    downsample: u32,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_log(level: &str) {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{h({l})}] - {m}{n}",
        )))
        .build();
    let level = match level {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .unwrap();
    log4rs::init_config(config).unwrap();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_log(&args.log_level);

    let dataset = KittiDataset::new(args.input_dir.join("data_scene_flow/testing"))
        .context("failed to index the KITTI testing split")?
        .downsample(args.downsample);

    let out_dir = args
        .output_dir
        .join(format!("window_size_{}", args.window_size));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    info!(
        "matching {} stereo pairs (window {}, max disparity {})",
        dataset.len(),
        args.window_size,
        args.max_disparity
    );
    let progress = ProgressBar::new(dataset.len() as u64);
    for index in 0..dataset.len() {
        let sample = dataset.get(index)?;
        let disparity = sad_disparity(
            &sample.left.view(),
            &sample.right.view(),
            args.window_size,
            args.max_disparity,
        );
        let image = disparity_to_image(&disparity.view(), args.max_disparity as f32)
            .context("failed to build the disparity image")?;
        let path = out_dir.join(format!("{:04}_w{:03}.png", index, args.window_size));
        image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        progress.inc(1);
    }
    progress.finish_with_message("disparity maps written");
    info!("finished, results in {}", out_dir.display());
    Ok(())
}
