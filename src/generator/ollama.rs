//! Ollama streaming backend.
//!
//! Posts to `/api/generate` with `stream: true` and reads the NDJSON body
//! line by line. Each line carries a `response` text increment; a line with
//! an `error` field ends generation with a failure.

use std::future::{self, Future};
use std::io;
use std::pin::Pin;

use futures_util::{StreamExt, TryStreamExt};
use serde::Deserialize;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::{prompt, Generator, TextStream};
use crate::config::OllamaConfig;
use crate::protocol::codec::NdjsonCodec;
use crate::{AppError, Result};

/// One line of an Ollama `/api/generate` stream.
#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

/// Streams completions from an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaGenerator {
    /// Build a backend for the server and model in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::Config(format!("failed to build ollama client: {err}")))?;
        Ok(Self {
            http,
            url: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: String) -> Pin<Box<dyn Future<Output = Result<TextStream>> + Send + '_>> {
        Box::pin(async move {
            let body = serde_json::json!({
                "model": self.model,
                "prompt": prompt::render(&prompt),
                "stream": true,
            });

            let response = self
                .http
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .map_err(|e| AppError::Generation(format!("ollama request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(AppError::Generation(format!(
                    "ollama returned {status}: {detail}"
                )));
            }

            let bytes = response.bytes_stream().map_err(io::Error::other);
            let lines = FramedRead::new(StreamReader::new(bytes), NdjsonCodec::new());

            Ok(lines
                .map(|line| line.and_then(|line| parse_line(&line)))
                .filter_map(|item| future::ready(item.transpose()))
                .boxed())
        })
    }
}

/// Extract the text increment from one stream line.
///
/// Returns `Ok(None)` for blank lines and for lines that carry no text
/// (the final `done` line).
fn parse_line(line: &str) -> Result<Option<String>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let parsed: GenerateLine = serde_json::from_str(line)
        .map_err(|e| AppError::Generation(format!("malformed ollama line: {e}")))?;

    if let Some(error) = parsed.error {
        return Err(AppError::Generation(format!("ollama: {error}")));
    }

    if parsed.done {
        debug!("ollama stream reported done");
    }

    Ok(Some(parsed.response).filter(|text| !text.is_empty()))
}
