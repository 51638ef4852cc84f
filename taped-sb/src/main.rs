//! taped-sb - Audio Sprite Builder
//!
//! Normalizes every clip under an input directory, concatenates them into one
//! sprite track per output format and writes a manifest of millisecond offsets.
//!
//! Exit status is non-zero on any failure; no manifest is written unless every
//! sprite track was produced.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taped_common::config::{write_toml_config, IntegrityPolicy, LoggingConfig};
use taped_common::ManifestFormat;
use taped_sb::config::{load_config, log_resolved, resolve, CliOverrides};
use taped_sb::{PipelineSettings, SoxEngine, SpritePipeline};

/// Command-line arguments for taped-sb
#[derive(Parser, Debug)]
#[command(name = "taped-sb")]
#[command(about = "Build an audio sprite and its offset manifest from a directory of clips")]
#[command(version)]
struct Args {
    /// Directory containing the source clips (.wav, .mp3)
    #[arg(required_unless_present = "write_config")]
    input_dir: Option<PathBuf>,

    /// Output directory for sprite tracks and manifest
    #[arg(short, long, env = "TAPED_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Base file name of the outputs
    #[arg(short, long, env = "TAPED_SPRITE_NAME")]
    name: Option<String>,

    /// Sprite encodings by file extension (repeat or comma-separate)
    #[arg(short = 'f', long = "format", env = "TAPED_FORMATS", value_delimiter = ',')]
    formats: Vec<String>,

    /// Manifest layout: range ([start, end]) or howler ([start, duration])
    #[arg(short, long)]
    manifest_format: Option<ManifestFormat>,

    /// Clips normalized concurrently
    #[arg(short, long, env = "TAPED_JOBS")]
    jobs: Option<usize>,

    /// Clip duration mismatch handling: fatal, exclude or warn
    #[arg(long)]
    on_mismatch: Option<IntegrityPolicy>,

    /// SoX executable
    #[arg(long, env = "TAPED_SOX")]
    sox: Option<String>,

    /// TOML config file (default: <config dir>/taped/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the resolved configuration to this file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            out_dir: self.out_dir.clone(),
            name: self.name.clone(),
            formats: self.formats.clone(),
            manifest_format: self.manifest_format,
            jobs: self.jobs,
            on_mismatch: self.on_mismatch,
            sox_binary: self.sox.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_config(args.config.as_deref(), std::io::stderr).context("Failed to load configuration")?;
    let config = resolve(toml_config, args.overrides()).context("Invalid configuration")?;

    init_tracing(&config.logging)?;

    info!(
        "Starting taped-sb {} ({} {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    if let Some(path) = &args.write_config {
        write_toml_config(&config, path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let input_dir = args.input_dir.context("Input directory not provided")?;
    log_resolved(&config);

    let engine = SoxEngine::new(config.engine.sox_binary.clone());
    let version = engine.probe().await.context("Audio engine unavailable")?;
    info!("Audio engine: {}", version);

    let pipeline = SpritePipeline::new(engine, PipelineSettings::from_config(input_dir, &config));

    // The pipeline future owns the run workspace; losing the race drops it
    let outcome = tokio::select! {
        result = pipeline.run() => Some(result),
        _ = shutdown_signal() => None,
    };

    let Some(result) = outcome else {
        warn!("Interrupted, run workspace removed, no manifest written");
        std::process::exit(130);
    };

    let summary = result.context("Sprite build failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Registry with env filter (RUST_LOG wins over the configured level) and a
/// fmt layer to stderr or the configured log file
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("taped_sb={0},taped_common={0}", logging.level)));

    let (stderr_layer, file_layer) = match &logging.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Ctrl+C / SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
