//! Smooth delivery of generated text.
//!
//! Backends emit increments of arbitrary size. Pacing re-chunks them by
//! word or by line and waits a fixed delay between chunks, so the client
//! sees an even flow of small frames. The delay only controls how fast
//! frames are produced; consumers must not rely on it.

use std::collections::VecDeque;
use std::mem;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};

use crate::config::Chunking;
use crate::generator::TextStream;
use crate::Result;

struct Pacer {
    inner: TextStream,
    chunking: Chunking,
    delay: Duration,
    buffer: String,
    ready: VecDeque<Result<String>>,
    exhausted: bool,
    emitted: bool,
}

/// Re-chunk `increments` according to `chunking`, waiting `delay` between
/// emitted chunks.
///
/// Text still buffered when the backend finishes or fails is flushed as a
/// final chunk, ahead of the failure.
#[must_use]
pub fn pace(increments: TextStream, chunking: Chunking, delay: Duration) -> TextStream {
    let pacer = Pacer {
        inner: increments,
        chunking,
        delay,
        buffer: String::new(),
        ready: VecDeque::new(),
        exhausted: false,
        emitted: false,
    };

    stream::unfold(pacer, |mut pacer| async move {
        let item = pacer.next_chunk().await?;
        Some((item, pacer))
    })
    .boxed()
}

impl Pacer {
    async fn next_chunk(&mut self) -> Option<Result<String>> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                if item.is_ok() && self.emitted && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.emitted = true;
                return Some(item);
            }

            if self.exhausted {
                return None;
            }

            match self.inner.next().await {
                Some(Ok(text)) => {
                    self.buffer.push_str(&text);
                    self.split_ready();
                }
                Some(Err(err)) => {
                    self.flush();
                    self.ready.push_back(Err(err));
                    self.exhausted = true;
                }
                None => {
                    self.flush();
                    self.exhausted = true;
                }
            }
        }
    }

    fn split_ready(&mut self) {
        if self.chunking == Chunking::None {
            self.flush();
            return;
        }

        while let Some(len) = next_chunk_len(&self.buffer, self.chunking) {
            let chunk: String = self.buffer.drain(..len).collect();
            self.ready.push_back(Ok(chunk));
        }
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.ready.push_back(Ok(mem::take(&mut self.buffer)));
        }
    }
}

/// Byte length of the first complete chunk in `buffer`, if any.
///
/// A word chunk is `\S+\s+` (with any leading whitespace); a line chunk is
/// `[^\n]*\n+`.
fn next_chunk_len(buffer: &str, chunking: Chunking) -> Option<usize> {
    match chunking {
        Chunking::Word => {
            let start = buffer.find(|c: char| !c.is_whitespace())?;
            let word = &buffer[start..];
            let gap = word.find(char::is_whitespace)?;
            let tail = &word[gap..];
            let run = tail
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(tail.len());
            Some(start + gap + run)
        }
        Chunking::Line => {
            let newline = buffer.find('\n')?;
            let tail = &buffer[newline..];
            let run = tail.find(|c: char| c != '\n').unwrap_or(tail.len());
            Some(newline + run)
        }
        Chunking::None => None,
    }
}
