//! Text generation backends.
//!
//! The [`Generator`] trait decouples the HTTP endpoint from whatever
//! produces the answer. A backend turns a prompt into a lazy stream of text
//! increments; an `Err` item ends generation with a failure.

pub mod echo;
pub mod ollama;
pub mod prompt;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::BoxStream;

use crate::config::{Backend, GeneratorConfig};
use crate::Result;

pub use echo::EchoGenerator;
pub use ollama::OllamaGenerator;

/// Lazy sequence of generated text increments.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Produces generated text for a prompt.
///
/// Implementations must be [`Send`] and [`Sync`] so one instance can serve
/// every request through an [`Arc`].
pub trait Generator: Send + Sync {
    /// Start generating an answer to `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Generation`](crate::AppError::Generation) if
    /// generation cannot start. Failures after the first increment are
    /// delivered as an `Err` item on the returned stream instead.
    fn generate(&self, prompt: String) -> Pin<Box<dyn Future<Output = Result<TextStream>> + Send + '_>>;
}

/// Build the backend selected by `config`.
///
/// # Errors
///
/// Returns [`AppError::Config`](crate::AppError::Config) if the backend's
/// HTTP client cannot be built.
pub fn from_config(config: &GeneratorConfig) -> Result<Arc<dyn Generator>> {
    Ok(match config.backend {
        Backend::Echo => Arc::new(EchoGenerator::new()),
        Backend::Ollama => Arc::new(OllamaGenerator::new(&config.ollama)?),
    })
}
