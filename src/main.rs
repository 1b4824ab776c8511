//! Tiny Llama API server

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tinyllama_api::api;
use tinyllama_api::app::AppState;
use tinyllama_api::storage::{self, download};
use tinyllama_api::types::config::{RunMode, ServerConfig};

#[derive(Parser)]
#[command(name = "tinyllama-api", version, about = "HTTP API for a local Tiny Llama model")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Download a GGUF model file
    DownloadModel {
        /// Hugging Face URL or user/repo/file of the model
        #[arg(long, default_value = download::DEFAULT_MODEL_URL)]
        url: String,
        /// Directory to store the model in
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::DownloadModel { url, output } => {
            init_logging("info");
            download_model(&url, output).await
        }
    }
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve() -> anyhow::Result<()> {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            error!("{}", e);
            error!("Configuration validation error. Server will not start.");
            std::process::exit(1);
        }
    };

    init_logging(match config.mode {
        RunMode::Development => "tinyllama_api=debug,tower_http=debug",
        RunMode::Production => "info",
    });

    let state = AppState::with_default_engine(config);
    let addr = state.config.bind_addr();
    info!(
        "Starting server in {} mode, model path: {}",
        state.config.mode,
        state.config.model_path.display()
    );

    let app = api::create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("API available at http://{}", addr);

    // Status is served while the model loads; generation is refused until then
    let lifecycle = state.lifecycle.clone();
    tokio::spawn(async move {
        let status = lifecycle.initialize().await;
        info!("Model state after initialization: {}", status.state);
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn download_model(url: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    let dest_dir = output.unwrap_or_else(storage::default_models_dir);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"),
    );

    let result = download::download_model(url, &dest_dir, |downloaded, total| {
        if let Some(total) = total {
            pb.set_length(total);
        }
        pb.set_position(downloaded);
    })
    .await;
    pb.finish_and_clear();

    match result {
        Ok(path) => {
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            println!("Model ready: {} ({})", path.display(), download::format_size(size));
            println!("Start the server with: MODEL_PATH={} PORT=3000 tinyllama-api", path.display());
            Ok(())
        }
        Err(e) => {
            error!("Download failed: {}", e);
            println!("You can download the model manually from:\n{url}");
            println!("and place it in: {}", dest_dir.display());
            Err(e.into())
        }
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
