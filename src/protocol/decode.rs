//! Chunk decoder: strict parse first, bounded repair second.

use serde_json::Value;
use tracing::debug;

use super::repair::repair;
use crate::{AppError, Result};

/// A structured value recovered from one chunk, not yet schema-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Parsed JSON value.
    pub value: Value,
    /// Whether the repair pass was needed to obtain `value`.
    pub repaired: bool,
}

/// Decode one chunk of response text into a [`Candidate`].
///
/// # Return value
///
/// - `Ok(None)` if the chunk is empty or whitespace only.
/// - `Ok(Some(candidate))` if strict parsing succeeded, or repair produced
///   parseable text.
///
/// Repair is attempted only after strict parsing fails, so a chunk that is
/// already valid always decodes exactly as [`serde_json::from_str`] would.
///
/// # Errors
///
/// Returns [`AppError::Protocol`]`("malformed json: …")` when neither stage
/// yields a value.
pub fn decode_chunk(chunk: &str) -> Result<Option<Candidate>> {
    let text = chunk.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let strict_err = match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            return Ok(Some(Candidate {
                value,
                repaired: false,
            }))
        }
        Err(e) => e,
    };

    let Some(fixed) = repair(text) else {
        return Err(AppError::Protocol(format!(
            "malformed json: {strict_err}; repair not applicable"
        )));
    };

    match serde_json::from_str::<Value>(&fixed) {
        Ok(value) => {
            debug!(error = %strict_err, "decoded chunk after repair");
            Ok(Some(Candidate {
                value,
                repaired: true,
            }))
        }
        Err(repair_err) => Err(AppError::Protocol(format!(
            "malformed json: {strict_err}; after repair: {repair_err}"
        ))),
    }
}
