//! Frame schema validation.
//!
//! This is the trust boundary for inbound frames: a [`Frame`] is only ever
//! built from untrusted input here, and nothing downstream re-checks shape.
//! Unknown extra fields are ignored.

use std::fmt::{Display, Formatter};

use serde_json::Value;

use super::{Frame, FrameKind};

/// Why a candidate value is not a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value is not a JSON object.
    NotAnObject,
    /// The `type` field is absent.
    MissingDiscriminant,
    /// The `type` field is present but not a string.
    DiscriminantNotString,
    /// The `type` field names neither `token` nor `error`.
    UnknownDiscriminant(String),
    /// The payload field required by the discriminant is absent.
    MissingPayload {
        /// Discriminant of the rejected frame.
        kind: FrameKind,
    },
    /// The payload field is present but not a string.
    PayloadNotString {
        /// Discriminant of the rejected frame.
        kind: FrameKind,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "frame is not a JSON object"),
            Self::MissingDiscriminant => write!(f, "frame has no `type` field"),
            Self::DiscriminantNotString => write!(f, "frame `type` is not a string"),
            Self::UnknownDiscriminant(raw) => write!(f, "unknown frame type `{raw}`"),
            Self::MissingPayload { kind } => write!(
                f,
                "`{}` frame has no `{}` field",
                kind.as_str(),
                kind.payload_field()
            ),
            Self::PayloadNotString { kind } => write!(
                f,
                "`{}` frame field `{}` is not a string",
                kind.as_str(),
                kind.payload_field()
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check `candidate` against the two frame shapes.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found: missing or unknown
/// discriminant, or a missing or non-string payload field.
pub fn validate(candidate: &Value) -> Result<Frame, ValidationError> {
    let object = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

    let raw_kind = object
        .get("type")
        .ok_or(ValidationError::MissingDiscriminant)?
        .as_str()
        .ok_or(ValidationError::DiscriminantNotString)?;

    let kind = FrameKind::from_wire(raw_kind)
        .ok_or_else(|| ValidationError::UnknownDiscriminant(raw_kind.to_owned()))?;

    let payload = object
        .get(kind.payload_field())
        .ok_or(ValidationError::MissingPayload { kind })?
        .as_str()
        .ok_or(ValidationError::PayloadNotString { kind })?
        .to_owned();

    Ok(match kind {
        FrameKind::Token => Frame::Token { value: payload },
        FrameKind::Error => Frame::Error { message: payload },
    })
}
