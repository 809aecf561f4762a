//! Shared fixtures for client-side unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use magic_bot::client::{ByteStream, ChatTransport, ErrorReporter, LogSink, StreamFailure};
use magic_bot::{AppError, Result};

/// Log sink keeping every line in memory.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LogSink for MemorySink {
    fn append_line(&self, line: &str) -> Result<()> {
        self.lines.lock().unwrap().push(line.to_owned());
        Ok(())
    }
}

/// Log sink that always fails.
pub struct BrokenSink;

impl LogSink for BrokenSink {
    fn append_line(&self, _line: &str) -> Result<()> {
        Err(AppError::Log("disk full".into()))
    }
}

/// Reporter writing into a fresh [`MemorySink`].
pub fn memory_reporter() -> (ErrorReporter, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    (ErrorReporter::new(sink.clone()), sink)
}

/// What the scripted transport does for one `open` call.
pub enum Script {
    /// Deliver these reads, then end the body.
    Body(Vec<io::Result<Bytes>>),
    /// Deliver these reads, then never produce another byte.
    Stalled(Vec<io::Result<Bytes>>),
    /// Fail before any body is returned.
    Fail(StreamFailure),
}

/// Body made of successful reads, one per string.
pub fn reads(chunks: &[&str]) -> Vec<io::Result<Bytes>> {
    chunks
        .iter()
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk.as_bytes())))
        .collect()
}

/// Transport replaying one [`Script`] per opened response.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ChatTransport for ScriptedTransport {
    fn open(
        &self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<ByteStream, StreamFailure>> + Send + '_>>
    {
        Box::pin(async move {
            self.prompts.lock().unwrap().push(prompt);
            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                Some(Script::Body(items)) => Ok(stream::iter(items).boxed()),
                Some(Script::Stalled(items)) => Ok(stream::iter(items).chain(stream::pending()).boxed()),
                Some(Script::Fail(failure)) => Err(failure),
                None => Err(StreamFailure::Transport("no scripted response left".into())),
            }
        })
    }
}
