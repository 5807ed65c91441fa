use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{BotCommandInfo, InlineKeyboard, MessagingCapabilities},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the only implementation today; handlers never talk to it
/// directly, they return [`crate::messaging::types::ReplyAction`]s that the
/// dispatcher executes against this port.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef>;

    async fn send_image(
        &self,
        chat_id: ChatId,
        image_url: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef>;

    /// Replace the media (and caption) of an existing message.
    async fn edit_image(
        &self,
        msg: MessageRef,
        image_url: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()>;

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()>;

    async fn edit_keyboard(&self, msg: MessageRef, keyboard: &InlineKeyboard) -> Result<()>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Publish the command menu.
    async fn set_commands(&self, commands: &[BotCommandInfo]) -> Result<()>;
}
