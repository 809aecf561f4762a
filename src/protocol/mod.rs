//! Streaming response wire protocol.
//!
//! A response body is a sequence of newline-terminated JSON records, each
//! one of exactly two shapes:
//!
//! ```json
//! {"type":"token","value":"Hel"}
//! {"type":"error","message":"Streaming failed...."}
//! ```
//!
//! The server encodes frames with [`codec::NdjsonCodec`]. The client frames
//! the byte stream with the same codec, turns each line into a candidate
//! value with [`decode::decode_chunk`] and checks it against the schema with
//! [`validate::validate`], which is the only place a [`Frame`] is built from
//! untrusted input.

pub mod codec;
pub mod decode;
pub mod repair;
pub mod validate;

use serde::{Deserialize, Serialize};

/// Discriminant of a [`Frame`], as written in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Incremental generated text.
    Token,
    /// Terminal, user-visible failure.
    Error,
}

impl FrameKind {
    /// Wire value of the `type` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Error => "error",
        }
    }

    /// Name of the payload field required by this kind.
    #[must_use]
    pub fn payload_field(self) -> &'static str {
        match self {
            Self::Token => "value",
            Self::Error => "message",
        }
    }

    /// Parse a wire discriminant.
    #[must_use]
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "token" => Some(Self::Token),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One self-contained unit of the streaming protocol.
///
/// The serde representation is internally tagged, so the payload field is
/// always the one matching the discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// A piece of generated text, appended to the in-flight answer.
    Token {
        /// Text increment.
        value: String,
    },
    /// A failure; no further frames follow for this response.
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl Frame {
    /// Build a token frame.
    pub fn token(value: impl Into<String>) -> Self {
        Self::Token {
            value: value.into(),
        }
    }

    /// Build an error frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Discriminant of this frame.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Token { .. } => FrameKind::Token,
            Self::Error { .. } => FrameKind::Error,
        }
    }

    /// The populated payload, whichever field it lives in.
    #[must_use]
    pub fn payload(&self) -> &str {
        match self {
            Self::Token { value } => value,
            Self::Error { message } => message,
        }
    }
}
