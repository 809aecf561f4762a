//! NDJSON codec for streaming response bodies.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so a
//! peer that never sends a newline cannot make the reader buffer without
//! bound.
//!
//! # Usage
//!
//! The server encodes [`Frame`] values directly into response body chunks.
//! The client wraps the response byte stream in
//! [`tokio_util::codec::FramedRead`] with this codec, which reassembles lines
//! split across network reads and hands back one complete line at a time.
//! At end of stream a final line without a trailing newline is still
//! delivered.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use super::Frame;
use crate::{AppError, Result};

/// Maximum line length accepted by the decoder: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Newline-delimited JSON codec shared by server and client.
///
/// Decoded lines exceeding [`MAX_LINE_BYTES`] yield
/// [`AppError::Protocol`]`("line too long: …")` and lines that are not
/// UTF-8 yield [`AppError::Protocol`]`("invalid utf-8 …")`; I/O errors on
/// the underlying reader map to [`AppError::Io`].
#[derive(Debug)]
pub struct NdjsonCodec(LinesCodec);

impl NdjsonCodec {
    /// Create a new codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for NdjsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for NdjsonCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

impl Encoder<String> for NdjsonCodec {
    type Error = AppError;

    /// Encode `item` as a `\n`-terminated line.
    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(map_codec_error)
    }
}

impl Encoder<&Frame> for NdjsonCodec {
    type Error = AppError;

    /// Serialise `frame` as compact JSON and append it as one line.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if serialisation fails.
    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        let line = serde_json::to_string(frame)
            .map_err(|e| AppError::Protocol(format!("failed to serialise frame: {e}")))?;
        self.0.encode(line, dst).map_err(map_codec_error)
    }
}

fn map_codec_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Protocol(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        // `LinesCodec` reports a line that is not UTF-8 as `InvalidData`.
        LinesCodecError::Io(io_err) if io_err.kind() == io::ErrorKind::InvalidData => {
            AppError::Protocol(format!("invalid utf-8 in line: {io_err}"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
