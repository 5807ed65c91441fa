use crate::domain::{ChatId, MessageId, MessageRef, UserId};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(CommandMessage),
    Text(TextMessage),
    Callback(CallbackQuery),
}

impl IncomingUpdate {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Command(c) => c.user_id,
            Self::Text(t) => t.user_id,
            Self::Callback(q) => q.user_id,
        }
    }
}

/// A `/name` message. `name` has no leading slash, no `@bot` suffix and is lower-cased.
/// Anything after the name is ignored.
#[derive(Clone, Debug)]
pub struct CommandMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub name: String,
}

impl CommandMessage {
    /// Parse raw message text. Returns `None` if it is not a command.
    pub fn parse(chat_id: ChatId, user_id: UserId, text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        // Telegram may send `/cmd@botname arg1 ...`
        let first = text.split(char::is_whitespace).next().unwrap_or("");
        let name = first
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or("")
            .to_lowercase();

        Some(Self {
            chat_id,
            user_id,
            name,
        })
    }
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub message_id: MessageId,
    pub callback_id: String,
    pub token: String,
}

impl CallbackQuery {
    pub fn message(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}

/// One inline button. `token` is produced by [`crate::callbacks::encode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub token: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Inline keyboard: ordered rows of ordered buttons.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row. Empty rows are dropped.
    pub fn row(mut self, row: Vec<InlineButton>) -> Self {
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}

/// One outbound operation produced by a handler.
///
/// The dispatcher executes a handler's actions in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyAction {
    SendText {
        chat_id: ChatId,
        text: String,
        controls: Option<InlineKeyboard>,
    },
    SendImage {
        chat_id: ChatId,
        image_url: String,
        caption: Option<String>,
        controls: Option<InlineKeyboard>,
    },
    EditImage {
        message: MessageRef,
        image_url: String,
        caption: Option<String>,
        controls: Option<InlineKeyboard>,
    },
    EditText {
        message: MessageRef,
        text: String,
        controls: Option<InlineKeyboard>,
    },
    EditControls {
        message: MessageRef,
        controls: InlineKeyboard,
    },
    DeleteMessage {
        message: MessageRef,
    },
    AcknowledgeCallback {
        callback_id: String,
        text: Option<String>,
    },
}

impl ReplyAction {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self::SendText {
            chat_id,
            text: text.into(),
            controls: None,
        }
    }

    pub fn ack(callback_id: &str, text: impl Into<String>) -> Self {
        Self::AcknowledgeCallback {
            callback_id: callback_id.to_string(),
            text: Some(text.into()),
        }
    }

    /// The keyboard this action renders, if any.
    pub fn controls(&self) -> Option<&InlineKeyboard> {
        match self {
            Self::SendText { controls, .. }
            | Self::SendImage { controls, .. }
            | Self::EditImage { controls, .. }
            | Self::EditText { controls, .. } => controls.as_ref(),
            Self::EditControls { controls, .. } => Some(controls),
            Self::DeleteMessage { .. } | Self::AcknowledgeCallback { .. } => None,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendText { .. } => "send_text",
            Self::SendImage { .. } => "send_image",
            Self::EditImage { .. } => "edit_image",
            Self::EditText { .. } => "edit_text",
            Self::EditControls { .. } => "edit_controls",
            Self::DeleteMessage { .. } => "delete_message",
            Self::AcknowledgeCallback { .. } => "acknowledge_callback",
        }
    }
}

/// Entry of the bot's command menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotCommandInfo {
    pub name: String,
    pub description: String,
}

/// Limits of a messenger implementation the dispatcher has to respect.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_command_menu: bool,
    /// Longest callback token, in bytes, the messenger accepts.
    pub max_callback_data_len: usize,
}
