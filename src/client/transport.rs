//! Client side of the HTTP transport.
//!
//! The transport only opens a response and hands back its body as an
//! ordered byte stream. It knows nothing about frames; framing, decoding and
//! validation happen in the session's read loop.

use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

use super::reporter::StreamFailure;
use crate::config::ClientConfig;
use crate::server::NDJSON_CONTENT_TYPE;
use crate::{AppError, Result};

/// Response body as delivered by the network, one read per item.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Opens a streaming response for a prompt.
pub trait ChatTransport: Send + Sync {
    /// Send `prompt` and return the response body.
    ///
    /// # Errors
    ///
    /// Returns [`StreamFailure::Transport`] if the request cannot be sent
    /// and [`StreamFailure::Rejected`] if the server answers with an error
    /// status.
    fn open(
        &self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<ByteStream, StreamFailure>> + Send + '_>>;
}

/// [`ChatTransport`] over HTTP `POST`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Transport for the endpoint and timeouts in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            url: config.server_url.clone(),
        })
    }

    /// Endpoint the prompts are posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChatTransport for HttpTransport {
    fn open(
        &self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<ByteStream, StreamFailure>> + Send + '_>>
    {
        Box::pin(async move {
            let response = self
                .http
                .post(&self.url)
                .header(ACCEPT, NDJSON_CONTENT_TYPE)
                .json(&serde_json::json!({ "prompt": prompt }))
                .send()
                .await
                .map_err(|e| StreamFailure::Transport(format!("request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                debug!(%status, body = %body, "chat request rejected");
                return Err(StreamFailure::Rejected {
                    status: status.as_u16(),
                    message: error_body_message(&body),
                });
            }

            Ok(response.bytes_stream().map_err(io::Error::other).boxed())
        })
    }
}

/// `message` of a `{"type":"error","message":…}` body, if that is what
/// `body` holds.
fn error_body_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if value.get("type").and_then(Value::as_str) != Some("error") {
        return None;
    }
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
