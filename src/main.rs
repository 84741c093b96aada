use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use hanko::backup;
use hanko::batch::{process_batch, BatchInput};
use hanko::constants::{COMPOSITE_MARGIN_FRACTION, CURRENT_SCHEMA_VERSION, PREVIEW_MARGIN_FRACTION};
use hanko::vault::{migrate_legacy_if_present, Vault, WatermarkAsset};
use hanko::watermark::{SettingsFile, WatermarkPosition};

/// Hanko - watermark compositing, batch processing and asset vault engine
#[derive(Parser, Debug)]
#[command(name = "hanko")]
#[command(version, about, long_about = None)]
struct Args {
    /// Data directory holding the vault and settings
    #[arg(short, long, default_value = "hanko-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark a set of images and write a single zip archive
    Batch {
        /// Input image files, processed in the given order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Watermark image file; defaults to the active vault watermark
        #[arg(short, long)]
        watermark: Option<PathBuf>,

        /// Output archive path
        #[arg(short, long, default_value = "watermarked.zip")]
        out: PathBuf,

        /// Override the configured opacity percent
        #[arg(long)]
        opacity: Option<u8>,

        /// Override the configured position (e.g. "bottom-right")
        #[arg(long)]
        position: Option<String>,

        /// Override the configured scale (fraction of the image width)
        #[arg(long)]
        scale: Option<f32>,

        /// Use the tighter live-preview edge margin
        #[arg(long)]
        preview_margin: bool,
    },

    /// Export the whole vault to a backup file
    Export {
        /// Output backup path
        #[arg(short, long, default_value = "hanko-backup.json")]
        out: PathBuf,
    },

    /// Replace the whole vault with the contents of a backup file
    Import {
        /// Backup file to restore from
        file: PathBuf,
    },

    /// Store a watermark image in the vault
    AddWatermark {
        /// Watermark image file
        file: PathBuf,

        /// Display name; defaults to the file name
        #[arg(short, long)]
        name: Option<String>,

        /// Make this the active watermark and enable watermarking
        #[arg(long)]
        activate: bool,
    },

    /// Delete a watermark from the vault
    RemoveWatermark {
        /// Id of the watermark to delete
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging subsystem
    hanko::logging::init_subscriber().expect("Failed to initialize logging subsystem");

    let args = Args::parse();

    if let Err(err) = run(args).await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let vault = Vault::open(&args.data_dir, CURRENT_SCHEMA_VERSION)
        .await
        .context("failed to open the vault")?;
    migrate_legacy_if_present(&vault).await;

    let settings_file = SettingsFile::new(&args.data_dir);

    match args.command {
        Command::Batch {
            inputs,
            watermark,
            out,
            opacity,
            position,
            scale,
            preview_margin,
        } => {
            let mut settings = settings_file.load().await;
            settings.is_enabled = true;
            if let Some(opacity) = opacity {
                settings.opacity = opacity;
            }
            if let Some(position) = position {
                settings.position = WatermarkPosition::parse_lenient(&position);
            }
            if let Some(scale) = scale {
                settings.scale = scale;
            }
            let settings = settings.clamped();

            let watermark_bytes = match watermark {
                Some(path) => Some(
                    tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?,
                ),
                None => settings
                    .active_watermark_id
                    .as_deref()
                    .and_then(|id| vault.get_watermark(id))
                    .map(|asset| asset.data),
            };
            if watermark_bytes.is_none() {
                tracing::warn!("no watermark given and none active, images pass through unchanged");
            }

            let mut batch = Vec::with_capacity(inputs.len());
            for path in &inputs {
                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(String::from)
                    .with_context(|| format!("unusable input filename: {}", path.display()))?;
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                batch.push(BatchInput::new(filename, bytes));
            }

            let margin = if preview_margin {
                PREVIEW_MARGIN_FRACTION
            } else {
                COMPOSITE_MARGIN_FRACTION
            };

            let archive = process_batch(
                &batch,
                watermark_bytes.as_deref(),
                &settings,
                margin,
                |percent| tracing::info!(percent, "batch progress"),
            )
            .map_err(hanko::error::HankoError::from)?;

            tokio::fs::write(&out, &archive)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("wrote {} ({} files)", out.display(), batch.len());
        }

        Command::Export { out } => {
            let settings = settings_file.load().await;
            let bytes = backup::export(&vault, &settings)
                .map_err(|e| anyhow::anyhow!(hanko::error::HankoError::from(e).user_message()))?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("wrote {}", out.display());
        }

        Command::Import { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let doc = backup::validate(&bytes)
                .map_err(|e| anyhow::anyhow!(hanko::error::HankoError::from(e).user_message()))?;
            let count = doc.record_count();
            backup::restore(&vault, &settings_file, doc)
                .await
                .map_err(|e| anyhow::anyhow!(hanko::error::HankoError::from(e).user_message()))?;
            println!("restored {count} records from {}", file.display());
        }

        Command::AddWatermark {
            file,
            name,
            activate,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            // Reject assets the compositor will never be able to decode
            image::load_from_memory(&bytes)
                .with_context(|| format!("{} is not a decodable image", file.display()))?;

            let name = name.unwrap_or_else(|| {
                file.file_stem()
                    .and_then(|n| n.to_str())
                    .unwrap_or("watermark")
                    .to_string()
            });
            let asset = WatermarkAsset::new(name, bytes);
            let id = asset.id.clone();
            vault
                .put_watermark(asset)
                .await
                .map_err(hanko::error::HankoError::from)?;

            if activate {
                let mut settings = settings_file.load().await;
                settings.active_watermark_id = Some(id.clone());
                settings.is_enabled = true;
                settings_file
                    .save(&settings)
                    .await
                    .context("failed to save settings")?;
            }
            println!("stored watermark {id}");
        }

        Command::RemoveWatermark { id } => {
            vault
                .delete_watermark(&id)
                .await
                .map_err(hanko::error::HankoError::from)?;

            // Keep the active pointer from dangling
            let mut settings = settings_file.load().await;
            if settings.detach_watermark(&id) {
                settings_file
                    .save(&settings)
                    .await
                    .context("failed to save settings")?;
            }
            println!("removed watermark {id}");
        }
    }

    Ok(())
}
