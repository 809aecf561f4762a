//! Per-response accumulation of validated frames into the transcript.
//!
//! ```text
//!            token                token
//!   Idle ─────────────▶ Streaming ──────┐
//!    │                   │  │  ▲────────┘
//!    │ error/failure     │  │ end of stream
//!    ▼                   │  ▼
//!  Failed ◀──────────────┘ Completed
//! ```
//!
//! `Cancelled` is reachable from `Idle` and `Streaming`. Every terminal
//! state is final: later frames are ignored, so nothing is appended once a
//! response has failed.
//!
//! A failure after some tokens keeps the partial answer intact and frozen,
//! and the error is appended as a separate message after it.

use tracing::{debug, error};
use uuid::Uuid;

use super::reporter::{ErrorReporter, StreamFailure};
use super::transcript::{MessageStatus, Transcript};
use crate::protocol::Frame;

/// Lifecycle of one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    /// Request sent, no frame accepted yet.
    Idle,
    /// At least one token accepted; the answer is growing.
    Streaming,
    /// The stream ended cleanly.
    Completed,
    /// The response ended with a reported failure.
    Failed,
    /// The read loop was cancelled and the partial answer discarded.
    Cancelled,
}

impl ResponseState {
    /// Whether no further frames will be processed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Transcript change caused by one accumulator step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `text` was added to the assistant message `message_id`, which is
    /// created by the first token.
    Token {
        /// Assistant message receiving the text.
        message_id: String,
        /// Appended text.
        text: String,
    },
    /// An error message was appended.
    Failed {
        /// Id of the appended error message.
        error_message_id: String,
    },
    /// The response completed.
    Completed,
    /// The response was cancelled; `discarded` is the removed partial answer.
    Cancelled {
        /// Id of the removed message, if one had been started.
        discarded: Option<String>,
    },
    /// Nothing changed.
    Ignored,
}

/// Folds the frames of a single response into a [`Transcript`].
#[derive(Debug, Clone)]
pub struct Accumulator {
    request_id: String,
    state: ResponseState,
    assistant_id: Option<String>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    /// Start accumulating a new response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            state: ResponseState::Idle,
            assistant_id: None,
        }
    }

    /// Identifier used to correlate logs for this response.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ResponseState {
        self.state
    }

    /// Id of the assistant token message, once the first token arrived.
    #[must_use]
    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant_id.as_deref()
    }

    /// Apply one validated frame.
    ///
    /// A token creates the assistant message or appends to it; an error
    /// frame fails the response with the server's message.
    pub fn apply(
        &mut self,
        transcript: &mut Transcript,
        reporter: &ErrorReporter,
        frame: Frame,
    ) -> Step {
        if self.state.is_terminal() {
            debug!(request_id = %self.request_id, state = ?self.state, "ignoring frame after terminal state");
            return Step::Ignored;
        }

        match frame {
            Frame::Token { value } => self.append_token(transcript, reporter, value),
            Frame::Error { message } => {
                self.fail(transcript, reporter, &StreamFailure::ServerSignaled(message))
            }
        }
    }

    /// Fail the response: freeze any partial answer and report `failure`.
    pub fn fail(
        &mut self,
        transcript: &mut Transcript,
        reporter: &ErrorReporter,
        failure: &StreamFailure,
    ) -> Step {
        if self.state.is_terminal() {
            return Step::Ignored;
        }

        self.freeze_answer(transcript);
        self.state = ResponseState::Failed;
        let error_message_id = reporter.report(transcript, failure);
        debug!(request_id = %self.request_id, %failure, "response failed");
        Step::Failed { error_message_id }
    }

    /// End of stream: freeze the answer.
    ///
    /// A stream that ends before any token completes without adding a
    /// message.
    pub fn finish(&mut self, transcript: &mut Transcript) -> Step {
        if self.state.is_terminal() {
            return Step::Ignored;
        }

        self.freeze_answer(transcript);
        self.state = ResponseState::Completed;
        Step::Completed
    }

    /// Abandon the response and remove its partial answer.
    pub fn cancel(&mut self, transcript: &mut Transcript) -> Step {
        if self.state.is_terminal() {
            return Step::Ignored;
        }

        let discarded = self.assistant_id.take();
        if let Some(id) = &discarded {
            if let Err(err) = transcript.discard_open(id) {
                error!(request_id = %self.request_id, %err, "failed to discard partial answer");
            }
        }
        self.state = ResponseState::Cancelled;
        Step::Cancelled { discarded }
    }

    fn append_token(
        &mut self,
        transcript: &mut Transcript,
        reporter: &ErrorReporter,
        value: String,
    ) -> Step {
        if let Some(id) = &self.assistant_id {
            if let Err(err) = transcript.append(id, &value) {
                error!(request_id = %self.request_id, %err, "answer could not be extended");
                let failure = StreamFailure::Internal(format!("cannot extend answer: {err}"));
                return self.fail(transcript, reporter, &failure);
            }
            return Step::Token {
                message_id: id.clone(),
                text: value,
            };
        }

        let id = transcript.push_assistant(value.clone(), MessageStatus::Token);
        self.assistant_id = Some(id.clone());
        self.state = ResponseState::Streaming;
        Step::Token {
            message_id: id,
            text: value,
        }
    }

    fn freeze_answer(&self, transcript: &mut Transcript) {
        if let Some(id) = &self.assistant_id {
            if let Err(err) = transcript.freeze(id) {
                error!(request_id = %self.request_id, %err, "failed to freeze answer");
            }
        }
    }
}
