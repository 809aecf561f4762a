#![forbid(unsafe_code)]

//! `magic-bot-chat`: terminal client for the `magic-bot` server.
//!
//! Reads one prompt per line from stdin and prints the answer as it
//! streams in. Ctrl-C while an answer is streaming cancels that answer;
//! Ctrl-C at the prompt, `/quit` or end of input exits.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use magic_bot::client::{ChatSession, ResponseState, SessionEvent};
use magic_bot::config::GlobalConfig;
use magic_bot::{AppError, Result};

const BANNER: &str = r"
 __  __    _    ____ ___ ____   ____   ___ _____
|  \/  |  / \  / ___|_ _/ ___| | __ ) / _ \_   _|
| |\/| | / _ \| |  _ | | |     |  _ \| | | || |
| |  | |/ ___ \ |_| || | |___  | |_) | |_| || |
|_|  |_/_/   \_\____|___\____| |____/ \___/ |_|
";

#[derive(Debug, Parser)]
#[command(
    name = "magic-bot-chat",
    about = "Terminal client for the magic-bot server",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the chat endpoint URL.
    #[arg(long)]
    server_url: Option<String>,

    /// Override the file receiving stream error diagnostics.
    #[arg(long)]
    error_log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing()?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = GlobalConfig::load_or_default(args.config.as_deref())?;
    if let Some(url) = args.server_url {
        config.client.server_url = url;
    }
    if let Some(path) = args.error_log {
        config.client.error_log_path = path;
    }

    let mut session = ChatSession::from_config(&config.client)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{BANNER}");

    loop {
        print!("❯ You ");
        flush_stdout();

        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|err| AppError::Io(format!("failed to read stdin: {err}")))?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt == "/quit" {
            break;
        }

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        print!("❯ Bot ");
        flush_stdout();

        let result = session.submit(prompt, &cancel, render).await;
        watcher.abort();

        match result {
            Ok(state) => debug!(?state, "response finished"),
            Err(err) => eprintln!("{err}"),
        }
    }

    Ok(())
}

fn render(event: SessionEvent) {
    let mut out = std::io::stdout().lock();
    if let Err(err) = write_event(&mut out, event) {
        debug!(%err, "failed to write to stdout");
    }
}

fn write_event(out: &mut impl Write, event: SessionEvent) -> io::Result<()> {
    match event {
        SessionEvent::Token { text, .. } => write!(out, "{text}")?,
        SessionEvent::Error { message, .. } => write!(out, "\nerror: {message}")?,
        SessionEvent::Finished(ResponseState::Cancelled) => writeln!(out, "\n[cancelled]")?,
        SessionEvent::Finished(_) => writeln!(out)?,
    }
    out.flush()
}

fn flush_stdout() {
    if let Err(err) = std::io::stdout().flush() {
        debug!(%err, "failed to flush stdout");
    }
}

fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))
}
