// cropframe-bin - CLI for cropping a portrait into a fixed-shape frame

use anyhow::Context;
use clap::Parser;
use cropframe::{compute_output_raster, AspectRatio, CropState, Viewport, DEFAULT_CONTAINER_HEIGHT, DEFAULT_LONG_EDGE};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rotate, flip, pan and zoom an image into a fixed-shape JPEG frame", long_about = None)]
struct Args {
    /// Image to crop
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path (JPEG format)
    #[arg(short, long, default_value = "cropped.jpg")]
    output: PathBuf,

    /// Frame shape as w:h
    #[arg(short, long, default_value = "3:4")]
    ratio: AspectRatio,

    /// Rotation in degrees, clockwise
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    rotation: f64,

    /// Zoom factor (0.5 to 3.0)
    #[arg(short, long, default_value = "1.0")]
    zoom: f64,

    /// Horizontal pan in frame units
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pan_x: f64,

    /// Vertical pan in frame units
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pan_y: f64,

    /// Mirror horizontally
    #[arg(long)]
    flip_x: bool,

    /// Mirror vertically
    #[arg(long)]
    flip_y: bool,

    /// Long edge of the output in pixels
    #[arg(long, default_value_t = DEFAULT_LONG_EDGE)]
    long_edge: u32,

    /// Height of the frame the pan values are measured against
    #[arg(long, default_value_t = DEFAULT_CONTAINER_HEIGHT)]
    container_height: f64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cropframe={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let source = image::open(&args.input).with_context(|| format!("Failed to open {}", args.input.display()))?;
    tracing::info!("Loaded {} ({}x{})", args.input.display(), source.width(), source.height());

    let mut state = CropState::new(args.ratio);
    state.set_zoom(args.zoom);
    state.rotate_by(args.rotation);
    state.pan_by(args.pan_x, args.pan_y);
    if args.flip_x {
        state.flip_horizontal();
    }
    if args.flip_y {
        state.flip_vertical();
    }

    let viewport = Viewport::for_ratio(args.ratio, args.container_height, source.width(), source.height());
    let cropped = compute_output_raster(&source, &state, &viewport, args.long_edge)?;
    cropped.save(&args.output)?;

    println!("Cropped image saved to: {} ({}x{})", args.output.display(), cropped.width, cropped.height);

    Ok(())
}
