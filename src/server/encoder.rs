//! Frame encoder for response bodies.
//!
//! Maps each generated increment to a token frame in order. The first
//! generation failure becomes a single error frame and ends the stream; no
//! token frame is ever emitted after it. Frames are serialised one at a time
//! so each reaches the transport as soon as it exists.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio_util::codec::Encoder;
use tracing::{debug, error};

use crate::generator::TextStream;
use crate::protocol::codec::NdjsonCodec;
use crate::protocol::Frame;
use crate::Result;

/// Message of the error frame sent when generation fails mid-stream.
///
/// The underlying cause is logged on the server and never sent.
pub const STREAM_FAILED_MESSAGE: &str = "Streaming failed....";

/// Turn text increments into frames, stopping after the first failure.
#[must_use]
pub fn encode_frames(increments: TextStream) -> BoxStream<'static, Frame> {
    stream::unfold(Some((increments, 0_usize)), |state| async move {
        let (mut increments, sent) = state?;
        match increments.next().await {
            Some(Ok(value)) => Some((Frame::token(value), Some((increments, sent + 1)))),
            Some(Err(err)) => {
                error!(%err, tokens = sent, "generation failed mid-stream");
                Some((Frame::error(STREAM_FAILED_MESSAGE), None))
            }
            None => {
                debug!(tokens = sent, "generation finished");
                None
            }
        }
    })
    .boxed()
}

/// Serialise `frames` into newline-terminated body chunks, one per frame.
#[must_use]
pub fn frame_body(frames: BoxStream<'static, Frame>) -> BoxStream<'static, Result<Bytes>> {
    let mut codec = NdjsonCodec::new();
    frames
        .map(move |frame| {
            let mut buf = BytesMut::new();
            codec.encode(&frame, &mut buf)?;
            Ok(buf.freeze())
        })
        .boxed()
}
