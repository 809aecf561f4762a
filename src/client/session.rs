//! Chat session: one transcript, one response at a time.
//!
//! [`ChatSession::submit`] records the prompt, opens a response and runs a
//! read loop scoped to that response:
//!
//! 1. the body is framed into lines by [`NdjsonCodec`], which buffers
//!    partial lines across network reads,
//! 2. each line is decoded (strict, then repair) and validated,
//! 3. the resulting frame or failure is applied to the [`Accumulator`].
//!
//! The loop ends when the accumulator reaches a terminal state. Failures
//! never escape `submit`; they end up in the transcript and the error log.
//!
//! # Overlapping prompts
//!
//! A session refuses a new prompt while a previous response is still
//! streaming. That can only happen when a `submit` future was dropped
//! mid-response; call [`ChatSession::cancel_in_flight`] to discard the
//! partial answer first. To abort a response from another task, cancel the
//! token given to `submit`.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use super::accumulator::{Accumulator, ResponseState, Step};
use super::reporter::{ErrorReporter, FileLogSink, StreamFailure};
use super::transcript::Transcript;
use super::transport::{ChatTransport, HttpTransport};
use crate::config::ClientConfig;
use crate::protocol::codec::NdjsonCodec;
use crate::protocol::decode::decode_chunk;
use crate::protocol::validate::validate;
use crate::{AppError, Result};

/// Incremental update emitted while a response is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Text was added to the assistant answer `message_id`.
    Token {
        /// Assistant message receiving the text.
        message_id: String,
        /// Appended text.
        text: String,
    },
    /// An error message was appended to the transcript.
    Error {
        /// Id of the error message.
        message_id: String,
        /// User-facing description.
        message: String,
    },
    /// The response reached a terminal state.
    Finished(ResponseState),
}

/// A conversation with the chat server.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    reporter: ErrorReporter,
    transcript: Transcript,
    in_flight: Option<Accumulator>,
}

impl ChatSession {
    /// Session using `transport` to reach the server and `reporter` for
    /// failures.
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, reporter: ErrorReporter) -> Self {
        Self {
            transport,
            reporter,
            transcript: Transcript::new(),
            in_flight: None,
        }
    }

    /// Session over HTTP with a file error log, both taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let sink = Arc::new(FileLogSink::new(config.error_log_path.clone()));
        Ok(Self::new(transport, ErrorReporter::new(sink)))
    }

    /// Conversation so far.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// State of the most recent response, if any prompt was submitted.
    #[must_use]
    pub fn last_response_state(&self) -> Option<ResponseState> {
        self.in_flight.as_ref().map(Accumulator::state)
    }

    /// Whether a response is still being accumulated.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|acc| !acc.state().is_terminal())
    }

    /// Discard an unfinished response left behind by a dropped `submit`.
    ///
    /// Returns the cancelled response's final state, or `None` if nothing
    /// was in flight.
    pub fn cancel_in_flight(&mut self) -> Option<ResponseState> {
        let acc = self
            .in_flight
            .as_mut()
            .filter(|acc| !acc.state().is_terminal())?;
        acc.cancel(&mut self.transcript);
        info!(request_id = acc.request_id(), "in-flight response cancelled");
        Some(acc.state())
    }

    /// Submit `prompt` and process the whole response.
    ///
    /// `observe` receives every incremental change, in order, as it is
    /// applied. Cancelling `cancel` stops the read loop and discards the
    /// partial answer.
    ///
    /// Returns the terminal state of the response. Server, decode,
    /// validation and transport failures are reported into the transcript
    /// and give `Ok(ResponseState::Failed)`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for a blank prompt and
    /// `AppError::Busy` while a previous response is still streaming. In
    /// both cases the transcript is left untouched.
    pub async fn submit<F>(
        &mut self,
        prompt: &str,
        cancel: &CancellationToken,
        mut observe: F,
    ) -> Result<ResponseState>
    where
        F: FnMut(SessionEvent),
    {
        if prompt.trim().is_empty() {
            return Err(AppError::InvalidInput("prompt must not be empty".into()));
        }

        if let Some(acc) = self.in_flight.as_ref().filter(|acc| !acc.state().is_terminal()) {
            return Err(AppError::Busy(format!(
                "response {} is still streaming",
                acc.request_id()
            )));
        }

        self.transcript.push_user(prompt);
        let acc = self.in_flight.insert(Accumulator::new());
        let span = info_span!("response", request_id = %acc.request_id());

        let mut run = ResponseRun {
            transport: self.transport.as_ref(),
            reporter: &self.reporter,
            transcript: &mut self.transcript,
            acc,
            observe: &mut observe,
        };

        Ok(run.drive(prompt.to_owned(), cancel).instrument(span).await)
    }
}

/// Borrowed state of one `submit` call.
struct ResponseRun<'a, F> {
    transport: &'a dyn ChatTransport,
    reporter: &'a ErrorReporter,
    transcript: &'a mut Transcript,
    acc: &'a mut Accumulator,
    observe: &'a mut F,
}

impl<F> ResponseRun<'_, F>
where
    F: FnMut(SessionEvent),
{
    async fn drive(&mut self, prompt: String, cancel: &CancellationToken) -> ResponseState {
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            opened = self.transport.open(prompt) => Some(opened),
        };

        let body = match opened {
            None => {
                let step = self.acc.cancel(self.transcript);
                self.emit(step);
                return self.acc.state();
            }
            Some(Err(failure)) => {
                let step = self.acc.fail(self.transcript, self.reporter, &failure);
                self.emit(step);
                return self.acc.state();
            }
            Some(Ok(body)) => body,
        };

        let mut lines = FramedRead::new(StreamReader::new(body), NdjsonCodec::new());

        while !self.acc.state().is_terminal() {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => self.acc.cancel(self.transcript),
                line = lines.next() => match line {
                    None => self.acc.finish(self.transcript),
                    Some(Ok(line)) => self.process_line(&line),
                    Some(Err(AppError::Protocol(detail))) => {
                        self.acc.fail(self.transcript, self.reporter, &StreamFailure::Decode(detail))
                    }
                    Some(Err(err)) => self.acc.fail(
                        self.transcript,
                        self.reporter,
                        &StreamFailure::Transport(err.to_string()),
                    ),
                },
            };
            self.emit(step);
        }

        debug!(state = ?self.acc.state(), "response loop finished");
        self.acc.state()
    }

    fn process_line(&mut self, line: &str) -> Step {
        let candidate = match decode_chunk(line) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return Step::Ignored,
            Err(err) => {
                let failure = StreamFailure::Decode(format!("{err}; chunk: {line}"));
                return self.acc.fail(self.transcript, self.reporter, &failure);
            }
        };

        if candidate.repaired {
            debug!(chunk = line, "frame required repair");
        }

        match validate(&candidate.value) {
            Ok(frame) => self.acc.apply(self.transcript, self.reporter, frame),
            Err(reason) => {
                let failure = StreamFailure::Validation(format!("{reason}; chunk: {line}"));
                self.acc.fail(self.transcript, self.reporter, &failure)
            }
        }
    }

    fn emit(&mut self, step: Step) {
        match step {
            Step::Token { message_id, text } => (self.observe)(SessionEvent::Token { message_id, text }),
            Step::Failed { error_message_id } => {
                let message = self
                    .transcript
                    .get(&error_message_id)
                    .map(|m| m.content().to_owned())
                    .unwrap_or_default();
                (self.observe)(SessionEvent::Error {
                    message_id: error_message_id,
                    message,
                });
                (self.observe)(SessionEvent::Finished(self.acc.state()));
            }
            Step::Completed | Step::Cancelled { .. } => {
                (self.observe)(SessionEvent::Finished(self.acc.state()));
            }
            Step::Ignored => {}
        }
    }
}
