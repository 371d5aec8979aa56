// lookbook - CLI for generating fashion photoshoots

use anyhow::Context;
use clap::{Parser, Subcommand};
use lookbook::cropframe::{self, CropState, Viewport};
use lookbook::orchestration::{
    Assistant, BatchEvent, BatchPhase, BatchRequest, GeminiClient, GenerationOrchestrator, HistoryStore, ImageData,
    ItemStatus, StudioConfig,
    types::{AspectRatio, Gender, ShootConfig},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate fashion photoshoots from a location and a portrait", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./lookbook.toml, then ~/.lookbook.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover garments and render one image per garment
    Generate(GenerateArgs),

    /// List saved batches, newest first
    History,

    /// Suggest a photoshoot style
    Suggest {
        #[arg(short, long, default_value = "female")]
        gender: Gender,
    },

    /// Describe the style, colours and pose of a photo
    Analyze { image: PathBuf },

    /// Find fashion districts in a city
    Locate {
        city: String,

        #[arg(long, default_value = "")]
        country: String,
    },
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(long, default_value = "")]
    country: String,

    #[arg(long)]
    city: Option<String>,

    #[arg(short, long, default_value = "female")]
    gender: Gender,

    #[arg(long, default_value = "")]
    style: String,

    #[arg(long, default_value = "")]
    background: String,

    #[arg(long, default_value = "")]
    pose: String,

    /// Image whose pose every shot copies
    #[arg(long)]
    pose_reference: Option<PathBuf>,

    /// Portrait of the person to dress
    #[arg(long)]
    source: Option<PathBuf>,

    /// Centre-crop the portrait to the shoot ratio before sending it
    #[arg(long)]
    crop_source: bool,

    #[arg(short, long, default_value = "3:4")]
    ratio: AspectRatio,

    /// Slower discovery with extended reasoning
    #[arg(long)]
    deep: bool,

    /// 2K renders on the pro image model
    #[arg(long)]
    high_quality: bool,

    /// Free-text outfit instruction; skips discovery
    #[arg(long)]
    custom: Option<String>,

    /// Kind of garment to look for
    #[arg(long)]
    garment: Option<String>,

    /// Directory for the rendered images
    #[arg(short, long, default_value = "lookbook-output")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("lookbook={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = match &cli.config {
        Some(path) => StudioConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => StudioConfig::load(),
    };

    match cli.command {
        Command::Generate(args) => generate(&config, args).await,
        Command::History => show_history(&config).await,
        Command::Suggest { gender } => {
            let assistant = assistant(&config)?;
            println!("{}", assistant.suggest_style(gender).await);
            Ok(())
        }
        Command::Analyze { image } => {
            let image = ImageData::from_path(&image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?;
            println!("{}", assistant(&config)?.analyze(&image).await);
            Ok(())
        }
        Command::Locate { city, country } => {
            println!("{}", assistant(&config)?.lookup_location(&city, &country).await);
            Ok(())
        }
    }
}

fn assistant(config: &StudioConfig) -> anyhow::Result<Assistant> {
    Ok(Assistant::new(Arc::new(GeminiClient::from_env(config)?)))
}

async fn generate(config: &StudioConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let client = Arc::new(GeminiClient::from_env(config)?);

    let mut shoot = ShootConfig::new(args.country, args.gender);
    shoot.city = args.city;
    shoot.photoshoot_style = args.style;
    shoot.background = args.background;
    shoot.pose = args.pose;
    shoot.aspect_ratio = args.ratio;
    shoot.deep_research = args.deep;
    shoot.high_quality = args.high_quality;
    if let Some(path) = &args.pose_reference {
        shoot.pose_reference = Some(read_image(path).await?);
    }

    let source_image = match &args.source {
        Some(path) if args.crop_source => Some(crop_to_frame(path, args.ratio, config.crop_long_edge)?),
        Some(path) => Some(read_image(path).await?),
        None => None,
    };

    let request = BatchRequest {
        source_image,
        config: shoot,
        custom_text: args.custom,
        garment_hint: args.garment,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut orchestrator = GenerationOrchestrator::new(
        client.clone(),
        client,
        HistoryStore::new(config.history_location()),
    )
    .with_pacing(config.pacing())
    .with_progress(tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let outcome = orchestrator.run_batch(request).await;
    drop(orchestrator);
    let _ = printer.await;

    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("Failed to create {}", args.out.display()))?;

    for (index, item) in outcome.items.iter().enumerate() {
        if item.status != ItemStatus::Success {
            continue;
        }
        let image = ImageData::from_data_url(&item.url);
        let extension = image.mime_type.rsplit('/').next().unwrap_or("png");
        let path = args.out.join(format!("{:02}-{}.{}", index + 1, slug(&item.garment_name), extension));
        let bytes = image.decode().context("Service returned malformed image data")?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {}", path.display());
    }

    println!(
        "{} of {} images generated",
        outcome.success_count(),
        outcome.items.len()
    );
    Ok(())
}

async fn show_history(config: &StudioConfig) -> anyhow::Result<()> {
    let store = HistoryStore::new(config.history_location());
    let entries = store.load_all().await;
    if entries.is_empty() {
        println!("No saved batches in {}", store.root().display());
        return Ok(());
    }

    for entry in entries {
        println!("{}  {}  ({} images)", entry.id, entry.date, entry.images.len());
        for item in &entry.images {
            println!("    {} - {}", item.garment_name, item.garment_origin);
        }
    }
    Ok(())
}

async fn read_image(path: &Path) -> anyhow::Result<ImageData> {
    ImageData::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn crop_to_frame(path: &Path, ratio: AspectRatio, long_edge: u32) -> anyhow::Result<ImageData> {
    let frame: cropframe::AspectRatio = ratio.as_str().parse()?;
    let source = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let viewport = Viewport::for_ratio(frame, cropframe::DEFAULT_CONTAINER_HEIGHT, source.width(), source.height());
    let cropped = cropframe::compute_output_raster(&source, &CropState::new(frame), &viewport, long_edge)?;
    Ok(ImageData::from_data_url(&cropped.to_data_url()))
}

fn print_event(event: &BatchEvent) {
    match event {
        BatchEvent::PhaseChanged(BatchPhase::Discovering) => println!("Researching garments..."),
        BatchEvent::PhaseChanged(BatchPhase::Persisting) => println!("Saving to history..."),
        BatchEvent::PhaseChanged(_) => {}
        BatchEvent::ReferenceLinks(links) => {
            for link in links {
                println!("  source: {}", link);
            }
        }
        BatchEvent::Placeholders(items) => {
            println!("Generating {} images:", items.len());
            for item in items {
                println!("  - {} ({})", item.garment_name, item.garment_origin);
            }
        }
        BatchEvent::ItemUpdated { index, item } => match item.status {
            ItemStatus::Loading => println!("[{}] rendering {}...", index + 1, item.garment_name),
            ItemStatus::Success => println!("[{}] done", index + 1),
            ItemStatus::Error => println!(
                "[{}] failed: {}",
                index + 1,
                item.error.as_deref().unwrap_or("unknown error")
            ),
            ItemStatus::Pending => {}
        },
    }
}

fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
    if slug.is_empty() { "image".to_string() } else { slug }
}
