//! Global configuration parsing and validation.
//!
//! Both binaries read the same TOML file. Every field has a default, so an
//! empty file (or no file at all) yields a working local setup: the server
//! on `127.0.0.1:3000` with the echo backend, and the chat client pointed at
//! it.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// How generated text is re-chunked before it is framed.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Chunking {
    /// One frame per word, including the whitespace that follows it.
    #[default]
    Word,
    /// One frame per line, including the newlines that end it.
    Line,
    /// Forward increments exactly as the backend produced them.
    None,
}

/// HTTP endpoint and frame pacing settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct ServerConfig {
    /// Interface the HTTP listener binds to.
    pub host: String,
    /// Port for the HTTP listener; 0 lets the OS choose.
    pub http_port: u16,
    /// Delay between consecutive frames, in milliseconds.
    pub frame_delay_ms: u64,
    /// Re-chunking strategy applied to generated text.
    pub chunking: Chunking,
    /// Largest accepted prompt, in bytes.
    pub max_prompt_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            http_port: 3000,
            frame_delay_ms: 30,
            chunking: Chunking::Word,
            max_prompt_bytes: 32_768,
        }
    }
}

impl ServerConfig {
    /// Socket address built from `host` and `http_port`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|err| AppError::Config(format!("invalid bind address: {err}")))
    }

    /// Pause inserted between frames.
    #[must_use]
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

/// Which generation backend the server drives.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Echo the prompt back; needs no external service.
    #[default]
    Echo,
    /// Stream completions from an Ollama server.
    Ollama,
}

/// Ollama connection settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama HTTP API.
    pub base_url: String,
    /// Model name passed to `/api/generate`.
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".into(),
            model: "llama3.2".into(),
        }
    }
}

/// Generation backend selection.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct GeneratorConfig {
    /// Selected backend.
    pub backend: Backend,
    /// Settings used when `backend = "ollama"`.
    pub ollama: OllamaConfig,
}

/// Terminal client settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct ClientConfig {
    /// Full URL of the chat endpoint.
    pub server_url: String,
    /// Append-only file receiving one line per reported failure.
    pub error_log_path: PathBuf,
    /// TCP connect timeout.
    pub connect_timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000/chat".into(),
            error_log_path: PathBuf::from("stream-error.log"),
            connect_timeout_seconds: 10,
        }
    }
}

impl ClientConfig {
    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct GlobalConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Generation backend settings.
    pub generator: GeneratorConfig,
    /// Chat client settings.
    pub client: ClientConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file is given but cannot be loaded.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.max_prompt_bytes == 0 {
            return Err(AppError::Config(
                "server.max_prompt_bytes must be greater than zero".into(),
            ));
        }

        self.server.bind_addr()?;

        if self.client.server_url.trim().is_empty() {
            return Err(AppError::Config("client.server_url must not be empty".into()));
        }

        if self.generator.backend == Backend::Ollama && self.generator.ollama.model.trim().is_empty()
        {
            return Err(AppError::Config(
                "generator.ollama.model must not be empty".into(),
            ));
        }

        Ok(())
    }
}
