use clap::{Parser, Subcommand};
use emoji_grid::imaging::{self, GridSize, Padding, RustBackend};
use emoji_grid::{bot, config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emoji-grid", version)]
#[command(about = "Turn pictures into grids of Telegram custom emoji")]
#[command(long_about = "\
Turn pictures into grids of Telegram custom emoji

The bot asks for a photo, suggests grid sizes that keep each piece close to
square, crops the photo into equal tiles, and publishes them as a custom emoji
pack. Typed in order, row by row, the emoji rebuild the picture.

The same cropping is available offline:

  emoji-grid suggest photo.jpg
  emoji-grid crop photo.jpg --grid 7x4 --padding 2

Configuration comes from config.toml (optional) and the BOT_TOKEN,
EMOJI_SIZE and TELEGRAM_API_URL environment variables.

Run 'emoji-grid gen-config' to generate a documented config.toml.")]
struct Cli {
    /// Config file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Telegram bot until Ctrl-C
    Run,
    /// Suggest grid sizes for a local image
    Suggest {
        /// Image to analyze
        image: PathBuf,
    },
    /// Crop a local image into emoji tiles
    Crop {
        /// Image to crop
        image: PathBuf,
        /// Grid as COLSxROWS, e.g. 7x4
        #[arg(long)]
        grid: GridSize,
        /// Padding level 1-5
        #[arg(long, default_value = "1")]
        padding: Padding,
        /// Output directory (default: image file stem)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("emoji_grid=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run => {
            let config = config::load_config(&cli.config)?;
            config.require_token()?;
            bot::run(&config).await?;
        }
        Command::Suggest { image } => {
            let (dims, grids) = imaging::suggest_for_image(&RustBackend::new(), &image)?;
            output::print_suggestions(&image, dims, &grids);
        }
        Command::Crop {
            image,
            grid,
            padding,
            out,
        } => {
            let config = config::load_config(&cli.config)?;
            let out = out.unwrap_or_else(|| default_output_dir(&image));
            let tiles = imaging::crop_to_grid(
                &RustBackend::new(),
                &image,
                grid,
                padding,
                config.emoji.tile_size,
            )?;
            let written = imaging::save_tiles(&tiles, &out)?;
            output::print_crop_result(&image, &out, grid, padding, &written);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `photos/cat.jpg` → `photos/cat`.
fn default_output_dir(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "emoji".into());
    image.with_file_name(stem)
}
