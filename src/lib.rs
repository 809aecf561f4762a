#![forbid(unsafe_code)]

//! Streaming chat over a newline-delimited token/error frame protocol.
//!
//! The server ([`server`]) turns generated text into a stream of frames; the
//! client ([`client`]) decodes, repairs, validates and accumulates that
//! stream into an append-only [`client::Transcript`].

pub mod client;
pub mod config;
pub mod errors;
pub mod generator;
pub mod protocol;
pub mod server;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
