#![forbid(unsafe_code)]

//! `magic-bot`: streaming chat server binary.
//!
//! Loads configuration, builds the generation backend and serves
//! `POST /chat` until Ctrl-C or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use magic_bot::config::GlobalConfig;
use magic_bot::server::{self, AppState};
use magic_bot::{generator, AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "magic-bot", about = "Streaming chat server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the HTTP port from the configuration.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("magic-bot server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = GlobalConfig::load_or_default(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.http_port = port;
    }
    info!(
        backend = ?config.generator.backend,
        chunking = ?config.server.chunking,
        frame_delay_ms = config.server.frame_delay_ms,
        "configuration loaded"
    );

    let generator = generator::from_config(&config.generator)?;
    let state = Arc::new(AppState {
        config: Arc::new(config),
        generator,
    });

    let ct = CancellationToken::new();
    let mut server_handle = tokio::spawn(server::serve(state, ct.clone()));

    let joined = tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received");
            ct.cancel();
            (&mut server_handle).await
        }
        joined = &mut server_handle => joined,
    };

    match joined {
        Ok(Ok(())) => info!("magic-bot shut down"),
        Ok(Err(err)) => {
            error!(%err, "HTTP server failed");
            return Err(err);
        }
        Err(err) => return Err(AppError::Io(format!("HTTP server task failed: {err}"))),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
