//! Backend that answers with the prompt itself.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{self, StreamExt};

use super::{Generator, TextStream};
use crate::Result;

/// Echoes every prompt back as a single increment.
///
/// Needs no external service, which makes it the default for local runs;
/// word or line pacing on the server splits the echo into many frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoGenerator;

impl EchoGenerator {
    /// Create an echo backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Generator for EchoGenerator {
    fn generate(&self, prompt: String) -> Pin<Box<dyn Future<Output = Result<TextStream>> + Send + '_>> {
        Box::pin(async move { Ok(stream::iter([Ok(prompt)]).boxed()) })
    }
}
