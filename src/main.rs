//! subdub - bilingual subtitles and Chinese voice-over for English videos
//!
//! Command line front end over the workspace tools. Responses are printed to stdout as
//! JSON; logs go to stderr and to `.subdub/log/`.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::Path;
use tracing::{Level, info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use subdub::cancel::CancellationToken;
use subdub::cli::{Args, Commands};
use subdub::config::Config;
use subdub::media::FfmpegMuxer;
use subdub::setup::SetupManager;
use subdub::tools::ToolService;

const DEFAULT_CONFIG_FILE: &str = "subdub.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting subdub");

    let mut config = load_config(args.config.as_deref())?;
    if let Some(root) = &args.root {
        config.workspace.root = root.clone();
    }

    let cancel = CancellationToken::new();
    if args.command.runs_pipeline() {
        spawn_interrupt_handler(cancel.clone());
    }

    match args.command {
        Commands::Setup => {
            let service = ToolService::new(&config, cancel);
            print_json(&service.setup_workspace().await)?;
            match FfmpegMuxer::new(config.media.clone()).version_info().await {
                Ok(version) => info!("Using {}", version),
                Err(e) => warn!("{}", e),
            }
        }
        Commands::List => {
            let service = ToolService::new(&config, cancel);
            print_json(&service.list_input_videos().await)?;
        }
        Commands::Process {
            filename,
            mode,
            model,
            monolingual,
        } => {
            if monolingual {
                config.pipeline.bilingual = false;
            }
            let service = ToolService::new(&config, cancel);
            print_json(&service.translate_one_video(&filename, mode, model).await)?;
        }
        Commands::Batch { mode, model } => {
            let service = ToolService::new(&config, cancel);
            print_json(&service.translate_videos(mode, model).await)?;
        }
        Commands::Models { download } => {
            list_models(&config, download).await?;
        }
        Commands::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            info!("Default configuration written to {}", path.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

/// First Ctrl-C stops at the next stage boundary, a second one exits immediately
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, stopping at the next stage boundary (Ctrl-C again to exit now)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second interrupt received, exiting");
            std::process::exit(130);
        }
    });
}

#[derive(Serialize)]
struct ModelStatus {
    name: String,
    filename: String,
    size_mb: f64,
    downloaded: bool,
}

async fn list_models(config: &Config, download: bool) -> Result<()> {
    let setup_manager = SetupManager::new(&config.transcriber.models_dir)?;

    if download {
        info!("Downloading all missing models...");
        for model in setup_manager.available_models() {
            if !setup_manager.is_downloaded(model.size) {
                setup_manager.download_model(&model).await?;
            }
        }
        info!("All models downloaded successfully");
    }

    let statuses: Vec<ModelStatus> = setup_manager
        .available_models()
        .into_iter()
        .map(|model| ModelStatus {
            name: model.size.to_string(),
            downloaded: setup_manager.is_downloaded(model.size),
            filename: model.filename,
            size_mb: model.size_mb,
        })
        .collect();

    print_json(&statuses)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".subdub").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subdub.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // stdout carries the JSON responses
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
