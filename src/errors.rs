//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Wire-level framing, decoding or validation failure.
    Protocol(String),
    /// Failure reported by the text generation backend.
    Generation(String),
    /// HTTP request or response body failure between client and server.
    Transport(String),
    /// Caller supplied input that cannot be processed.
    InvalidInput(String),
    /// A response is still streaming and the request was refused.
    Busy(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// Append-only diagnostic log could not be written.
    Log(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Generation(msg) => write!(f, "generation: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::InvalidInput(msg) => write!(f, "input: {msg}"),
            Self::Busy(msg) => write!(f, "busy: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Log(msg) => write!(f, "log: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
