//! Chat client: transcript, response accumulation and failure reporting.

pub mod accumulator;
pub mod reporter;
pub mod session;
pub mod transcript;
pub mod transport;

pub use accumulator::{Accumulator, ResponseState, Step};
pub use reporter::{ErrorReporter, FileLogSink, LogSink, StreamFailure};
pub use session::{ChatSession, SessionEvent};
pub use transcript::{Message, MessageStatus, Role, Transcript};
pub use transport::{ByteStream, ChatTransport, HttpTransport};
