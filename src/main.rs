use anyhow::Context;
use clap::{Parser, Subcommand};
use gallery_watermark::config::Config;
use gallery_watermark::watermark::{read_metadata, WatermarkProcessor};
use std::path::{Path, PathBuf};

/// Gallery Watermark - tiled text watermarks for image marketplace previews
#[derive(Parser, Debug)]
#[command(name = "gallery-watermark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service
    Serve {
        /// Validate configuration and exit
        #[arg(long)]
        test: bool,
    },
    /// Watermark an image file and print its metadata as JSON
    Apply {
        /// Source image (JPEG, PNG or WebP)
        input: PathBuf,
        /// Destination of the JPEG preview
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print image metadata as JSON without watermarking
    Inspect {
        /// Source image (JPEG, PNG or WebP)
        input: PathBuf,
    },
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = if path.exists() {
        Config::from_file(path).map_err(anyhow::Error::msg)?
    } else {
        Config::default()
    };
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = load_config(&args.config).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = gallery_watermark::logging::init_subscriber(&config.logging) {
        eprintln!("Failed to initialize logging subsystem: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args, config).await {
        tracing::error!(error = %format!("{:#}", e), "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, config: Config) -> anyhow::Result<()> {
    match args.command {
        Command::Serve { test } => {
            tracing::info!(
                config_file = %args.config.display(),
                server_address = %config.server.address,
                server_port = config.server.port,
                label = %config.watermark.label,
                divisor = config.watermark.divisor,
                blend = config.watermark.blend.as_str(),
                hosting_enabled = config.hosting.is_some(),
                "Configuration loaded successfully"
            );
            if test {
                return Ok(());
            }
            gallery_watermark::server::serve(&config).await
        }
        Command::Apply { input, output } => {
            let source = std::fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;

            let processor = WatermarkProcessor::new(config.watermark)?;
            let result = processor.apply_blocking(source.into()).await?;

            std::fs::write(&output, &result.image.data)
                .with_context(|| format!("failed to write {}", output.display()))?;

            tracing::info!(
                input = %input.display(),
                output = %output.display(),
                tiles = result.image.tile_count,
                output_bytes = result.image.data.len(),
                "Watermarked image written"
            );
            println!("{}", serde_json::to_string_pretty(&result.metadata)?);
            Ok(())
        }
        Command::Inspect { input } => {
            let source = std::fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let metadata = read_metadata(&source)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
            Ok(())
        }
    }
}
