use std::fmt;

use chrono::{DateTime, Utc};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Durable id of a saved image row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SavedId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SavedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The feed category a user is currently browsing. One per user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub user_id: UserId,
    pub name: String,
}

/// An image the upstream catalog returned. Never persisted as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub external_id: String,
    pub image_url: String,
    pub category_name: String,
}

/// An image in a user's saved collection.
///
/// `(user_id, external_id)` is unique per store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedImage {
    pub id: SavedId,
    pub user_id: UserId,
    pub external_id: String,
    pub image_url: String,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
}
