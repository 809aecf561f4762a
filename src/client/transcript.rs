//! Conversation transcript.
//!
//! The transcript is an ordered, append-only list of messages. It is only
//! ever mutated through the methods here, which enforce the message
//! lifecycle: user messages and error messages are frozen on creation, an
//! assistant token message grows until it is frozen, and a frozen message
//! never changes again.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Author of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Prompt typed by the user.
    User,
    /// Generated answer or surfaced failure.
    Assistant,
}

/// What an assistant message represents. User messages are always `Token`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Normal text.
    Token,
    /// A failure surfaced to the user.
    Error,
}

/// One conversation entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    id: String,
    role: Role,
    content: String,
    status: MessageStatus,
    #[serde(skip)]
    frozen: bool,
}

impl Message {
    fn new(role: Role, content: String, status: MessageStatus, frozen: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            status,
            frozen,
        }
    }

    /// Unique identifier, fixed at creation.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Author of the message.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether this message is normal text or a surfaced failure.
    #[must_use]
    pub fn status(&self) -> MessageStatus {
        self.status
    }

    /// Whether the content can still grow.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Ordered list of conversation messages.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recently inserted message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Look up a message by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Append a user prompt; it is frozen immediately. Returns its id.
    pub fn push_user(&mut self, content: impl Into<String>) -> String {
        self.push(Message::new(
            Role::User,
            content.into(),
            MessageStatus::Token,
            true,
        ))
    }

    /// Append an assistant message. Returns its id.
    ///
    /// `Token` messages stay open for [`append`](Self::append) until
    /// [`freeze`](Self::freeze); `Error` messages are frozen immediately.
    pub fn push_assistant(&mut self, content: impl Into<String>, status: MessageStatus) -> String {
        self.push(Message::new(
            Role::Assistant,
            content.into(),
            status,
            status == MessageStatus::Error,
        ))
    }

    /// Append `text` to the open assistant message `id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id and
    /// `AppError::InvalidInput` if the message is frozen.
    pub fn append(&mut self, id: &str, text: &str) -> Result<()> {
        let message = self.get_open_mut(id)?;
        message.content.push_str(text);
        Ok(())
    }

    /// Freeze message `id`. Freezing a frozen message is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    pub fn freeze(&mut self, id: &str) -> Result<()> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("message {id}")))?;
        message.frozen = true;
        Ok(())
    }

    /// Remove the open assistant message `id`, keeping every other message
    /// in its original order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id and
    /// `AppError::InvalidInput` if the message is frozen.
    pub fn discard_open(&mut self, id: &str) -> Result<Message> {
        self.get_open_mut(id)?;
        let index = self
            .messages
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("message {id}")))?;
        Ok(self.messages.remove(index))
    }

    fn push(&mut self, message: Message) -> String {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    fn get_open_mut(&mut self, id: &str) -> Result<&mut Message> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("message {id}")))?;
        if message.frozen || message.role != Role::Assistant {
            return Err(AppError::InvalidInput(format!("message {id} is frozen")));
        }
        Ok(message)
    }
}
