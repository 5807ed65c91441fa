use std::fmt::Display;

use crate::domain::ChatId;

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the dispatcher
/// can tell user-facing failures (`Chat`) from defects and plumbing faults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rendered by the dispatcher as a plain reply to `chat_id`.
    #[error("{message}")]
    Chat { chat_id: ChatId, message: String },

    /// Malformed callback token or embedded data.
    #[error("decode error: {0}")]
    Decode(String),

    /// A bot-generated page or index outside the valid range.
    #[error("out of range: {0}")]
    Range(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn chat(chat_id: ChatId, message: impl Into<String>) -> Self {
        Self::Chat {
            chat_id,
            message: message.into(),
        }
    }
}

/// Wraps remote/storage failures into a chat-scoped error.
pub trait ResultExt<T> {
    /// Log the underlying cause and replace it with `message` addressed to `chat_id`.
    fn or_chat(self, chat_id: ChatId, message: &str) -> Result<T>;
}

impl<T, E: Display> ResultExt<T> for std::result::Result<T, E> {
    fn or_chat(self, chat_id: ChatId, message: &str) -> Result<T> {
        self.map_err(|e| {
            tracing::warn!(chat_id = %chat_id, error = %e, "{message}");
            Error::chat(chat_id, message)
        })
    }
}
