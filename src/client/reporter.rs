//! Failure reporting for streamed responses.
//!
//! Every way a response can fail ends up here as a [`StreamFailure`]. The
//! [`ErrorReporter`] appends a synthetic assistant error message with a
//! stable, user-facing description and writes the technical detail to an
//! append-only [`LogSink`]. Reporting never fails: if the sink cannot be
//! written, the problem goes to standard error and is otherwise dropped.

use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::transcript::{MessageStatus, Transcript};
use crate::{AppError, Result};

/// Shown for chunks that cannot be decoded or validated.
pub const INVALID_RESPONSE_MESSAGE: &str = "invalid response from server";

/// Shown for connection and read failures.
pub const TRANSPORT_FAILED_MESSAGE: &str = "Something went wrong";

/// Shown when the client broke one of its own transcript invariants.
pub const INTERNAL_FAILURE_MESSAGE: &str = "internal client error";

/// Shown when the server refused the request without a readable reason.
pub const REQUEST_REJECTED_MESSAGE: &str = "request rejected by server";

/// Why a response ended in failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFailure {
    /// The server answered with an error status before any frame.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// `message` of the structured error body, when present.
        message: Option<String>,
    },
    /// The server sent an error frame.
    ServerSignaled(String),
    /// A chunk could not be turned into JSON, even after repair.
    Decode(String),
    /// A chunk was JSON but not a frame.
    Validation(String),
    /// The connection failed or the body could not be read.
    Transport(String),
    /// The transcript refused a change the accumulator made.
    Internal(String),
}

impl StreamFailure {
    /// Description shown in the transcript. Never contains internal detail.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } => message.as_str(),
            Self::Rejected { message: None, .. } => REQUEST_REJECTED_MESSAGE,
            Self::ServerSignaled(message) => message.as_str(),
            Self::Decode(_) | Self::Validation(_) => INVALID_RESPONSE_MESSAGE,
            Self::Transport(_) => TRANSPORT_FAILED_MESSAGE,
            Self::Internal(_) => INTERNAL_FAILURE_MESSAGE,
        }
    }
}

impl Display for StreamFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { status, message } => write!(
                f,
                "request rejected with status {status}: {}",
                message.as_deref().unwrap_or("<no message>")
            ),
            Self::ServerSignaled(message) => write!(f, "server signaled error: {message}"),
            Self::Decode(detail) => write!(f, "decode failure: {detail}"),
            Self::Validation(detail) => write!(f, "validation failure: {detail}"),
            Self::Transport(detail) => write!(f, "transport failure: {detail}"),
            Self::Internal(detail) => write!(f, "internal failure: {detail}"),
        }
    }
}

/// Append-only destination for diagnostic lines.
///
/// Implementations must be [`Send`] and [`Sync`] so a sink can be shared
/// through an [`Arc`].
pub trait LogSink: Send + Sync {
    /// Append one line. `line` carries no trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn append_line(&self, line: &str) -> Result<()>;
}

/// Log sink appending to a file, created on first write.
pub struct FileLogSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl FileLogSink {
    /// Sink writing to `path`. Nothing is opened until the first line.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            writer: Mutex::new(None),
        }
    }

    /// File receiving the log lines.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> Result<BufWriter<File>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Log(format!(
                    "failed to create log directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AppError::Log(format!("failed to open log {}: {e}", path.display())))?;
        Ok(BufWriter::new(file))
    }
}

impl LogSink for FileLogSink {
    fn append_line(&self, line: &str) -> Result<()> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| AppError::Log("log writer mutex poisoned".into()))?;

        if guard.is_none() {
            *guard = Some(Self::open(&self.path)?);
        }

        if let Some(writer) = guard.as_mut() {
            writeln!(writer, "{line}").map_err(|e| AppError::Log(format!("write failed: {e}")))?;
            writer
                .flush()
                .map_err(|e| AppError::Log(format!("flush failed: {e}")))?;
        }

        Ok(())
    }
}

/// Surfaces failures in the transcript and records them in a log sink.
#[derive(Clone)]
pub struct ErrorReporter {
    sink: Arc<dyn LogSink>,
}

impl ErrorReporter {
    /// Reporter writing diagnostics to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Append an error message for `failure` and log its detail.
    ///
    /// Returns the id of the appended message.
    pub fn report(&self, transcript: &mut Transcript, failure: &StreamFailure) -> String {
        let id = transcript.push_assistant(failure.user_message(), MessageStatus::Error);
        self.log(&failure.to_string());
        id
    }

    /// Write one timestamped diagnostic line for `detail`.
    pub fn log(&self, detail: &str) {
        let line = format_log_line(Utc::now(), detail);
        if let Err(err) = self.sink.append_line(&line) {
            eprintln!("failed to write log: {err}");
        }
    }
}

/// Format a diagnostic line: `[<RFC 1123 UTC time>] [ERROR] <detail>`.
///
/// Line breaks in `detail` are escaped so each failure stays on one line.
#[must_use]
pub fn format_log_line(at: DateTime<Utc>, detail: &str) -> String {
    let detail = detail.replace('\r', "\\r").replace('\n', "\\n");
    format!("[{}] [ERROR] {detail}", at.format("%a, %d %b %Y %H:%M:%S GMT"))
}
