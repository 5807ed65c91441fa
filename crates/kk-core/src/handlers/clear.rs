//! `/clear`: two-step confirmation before wiping the saved collection.

use async_trait::async_trait;
use tracing::info;

use crate::{
    callbacks,
    errors::{Error, ResultExt},
    handlers::{emoji, ChatHandler, CommandSpec, Services},
    messaging::types::{CallbackQuery, CommandMessage, InlineButton, InlineKeyboard, ReplyAction},
    Result,
};

pub const CLEAR_COMMAND: &str = "clear";
pub const CONFIRM_CLEAR_CALLBACK: &str = "clear_confirm";

const ALREADY_EMPTY: &str = "Your collection is already empty...";
const CONFIRM_PROMPT: &str = "Are you sure you want to clear your collection?";
const CLEARED: &str = "Your collection has been cleared. Hope you find something better!";
const CLEAR_FAILED: &str = "Could not clear your collection.";

pub struct ClearHandler {
    services: Services,
}

impl ClearHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    async fn request_clear(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        let has_any = self
            .services
            .has_saved(cmd.user_id)
            .await
            .or_chat(cmd.chat_id, CLEAR_FAILED)?;
        if !has_any {
            return Ok(vec![ReplyAction::text(cmd.chat_id, ALREADY_EMPTY)]);
        }

        info!(user_id = %cmd.user_id, "clear requested");
        let keyboard = InlineKeyboard::new().row(vec![InlineButton::new(
            format!("{} Clear it", emoji::DISAPPOINTED_FACE),
            callbacks::encode(CONFIRM_CLEAR_CALLBACK, None),
        )]);
        Ok(vec![ReplyAction::SendText {
            chat_id: cmd.chat_id,
            text: CONFIRM_PROMPT.to_string(),
            controls: Some(keyboard),
        }])
    }

    async fn confirm_clear(&self, q: &CallbackQuery) -> Result<Vec<ReplyAction>> {
        let removed = self
            .services
            .clear_saved(q.user_id)
            .await
            .or_chat(q.chat_id, CLEAR_FAILED)?;

        info!(user_id = %q.user_id, removed, "collection cleared");
        Ok(vec![ReplyAction::text(q.chat_id, CLEARED)])
    }
}

#[async_trait]
impl ChatHandler for ClearHandler {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn commands(&self) -> &'static [CommandSpec] {
        &[CommandSpec {
            name: CLEAR_COMMAND,
            description: "Clear my collection",
        }]
    }

    fn callbacks(&self) -> &'static [&'static str] {
        &[CONFIRM_CLEAR_CALLBACK]
    }

    async fn handle_command(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        match cmd.name.as_str() {
            CLEAR_COMMAND => self.request_clear(cmd).await,
            other => Err(Error::External(format!("clear: unexpected command {other:?}"))),
        }
    }

    async fn handle_callback(
        &self,
        identifier: &str,
        q: &CallbackQuery,
    ) -> Result<Vec<ReplyAction>> {
        match identifier {
            CONFIRM_CLEAR_CALLBACK => self.confirm_clear(q).await,
            other => Err(Error::External(format!("clear: unexpected callback {other:?}"))),
        }
    }
}
