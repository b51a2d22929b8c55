//! `gt-tool`: inspect and maintain ground truth file sets.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use gtannot::config::GtConfig;
use gtannot::format::{GroundTruthCodec, ReadReport, WriteOptions};
use gtannot::model::{FrameGroundTruth, ObjectShape, foreground_count};

#[derive(Parser, Debug)]
#[command(name = "gt-tool", about = "Inspect and maintain frame ground truth")]
struct Args {
    /// Configuration file (JSON)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the objects stored for a frame
    Inspect {
        /// Image the ground truth belongs to
        image: PathBuf,
    },
    /// Denoise every scribble object's map and write the frame back
    Filter {
        image: PathBuf,
        /// Filter passes (defaults to the configured value)
        #[arg(long)]
        passes: Option<u32>,
        /// Write back even if some objects could not be loaded (they are dropped)
        #[arg(long)]
        force: bool,
    },
    /// Write the full-frame object-id map
    FrameMap {
        image: PathBuf,
        /// Write back even if some objects could not be loaded (they are dropped)
        #[arg(long)]
        force: bool,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
}

fn load_frame(codec: &GroundTruthCodec, image: &Path) -> Result<(FrameGroundTruth, ReadReport)> {
    let Some((frame, report)) = codec
        .read(image)
        .with_context(|| format!("reading ground truth for {}", image.display()))?
    else {
        bail!("no ground truth stored for {}", image.display());
    };
    if report.has_errors() {
        log::warn!(
            "{} problem(s) while loading {}",
            report.warnings.len(),
            image.display()
        );
    }
    Ok((frame, report))
}

fn inspect(codec: &GroundTruthCodec, image: &Path) -> Result<()> {
    let (frame, _) = load_frame(codec, image)?;
    let info = &frame.info;
    println!(
        "{}: {} / {} / {} / {} / {}",
        image.display(),
        info.illumination,
        info.weather,
        info.road_type,
        info.road_event,
        info.country
    );
    for object in frame.objects() {
        let id = object.object_id.unwrap_or_default();
        let rect = object.bounding_rect().unwrap_or_default();
        let detail = match object.shape() {
            ObjectShape::BoundingBox(_) => "bounding box".to_string(),
            ObjectShape::Scribble { crops, .. } => format!(
                "scribble, {} crop(s), {} px",
                crops.len(),
                object.object_map().map(foreground_count).unwrap_or(0)
            ),
            ObjectShape::Polygon { vertices } => format!("polygon, {} vertices", vertices.len()),
        };
        println!(
            "  #{:<4} {:<12} {:<12} {:<12} occl={:<5} ({}, {}) {}x{}  {}",
            id,
            object.attributes.object_type,
            object.attributes.class,
            object.attributes.value,
            object.attributes.occlusion.as_str(),
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            detail
        );
    }
    Ok(())
}

fn filter(codec: &GroundTruthCodec, image: &Path, passes: u32, force: bool) -> Result<()> {
    let (mut frame, report) = load_frame(codec, image)?;
    let ids: Vec<_> = frame.objects().iter().filter_map(|o| o.object_id).collect();
    let mut filtered = 0;
    for id in ids {
        if let Some(object) = frame.object_mut(id) {
            if object.filter_merged_map(passes) {
                filtered += 1;
            }
        }
    }
    codec.write_back(&frame, &report, image, force)?;
    log::info!("Filtered {} object map(s) with {} pass(es)", filtered, passes);
    Ok(())
}

fn frame_map(
    codec: &GroundTruthCodec,
    image: &Path,
    (width, height): (u32, u32),
    force: bool,
) -> Result<()> {
    let (frame, report) = load_frame(codec, image)?;
    let frame = frame.with_frame_size(width, height);
    let options = codec.options().clone().export_frame_map(true);
    GroundTruthCodec::with_options(options).write_back(&frame, &report, image, force)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = GtConfig::load_or_default(args.config.as_deref())
        .context("loading configuration")?;

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let codec = GroundTruthCodec::with_options(WriteOptions::from(&config));
    match args.command {
        Command::Inspect { image } => inspect(&codec, &image),
        Command::Filter {
            image,
            passes,
            force,
        } => filter(
            &codec,
            &image,
            passes.unwrap_or(config.filter_passes),
            force,
        ),
        Command::FrameMap {
            image,
            force,
            width,
            height,
        } => frame_map(&codec, &image, (width, height), force),
    }
}
