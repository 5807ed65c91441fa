//! Routes inbound updates to handlers and executes their reply actions.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::{
    callbacks,
    domain::{ChatId, UserId},
    errors::Error,
    handlers::HandlerRegistry,
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, CommandMessage, IncomingUpdate, ReplyAction, TextMessage},
    },
    Result,
};

const UNSUPPORTED_COMMAND: &str = "Sorry, that command is not supported :(";
const TEXT_HINT: &str = "Meow! Use the commands from the menu.";

/// Per-user async locks.
///
/// A user's paging and removal turns must not interleave: each one re-reads
/// the collection and renders against it.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn lock_user(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Nobody holds or waits on a lock only the map refers to.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DispatcherOptions {
    /// Reply to unknown commands instead of ignoring them.
    pub reply_unsupported: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            reply_unsupported: true,
        }
    }
}

pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    messenger: Arc<dyn MessagingPort>,
    locks: UserLocks,
    options: DispatcherOptions,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        messenger: Arc<dyn MessagingPort>,
        options: DispatcherOptions,
    ) -> Self {
        info!(commands = ?registry.command_names(), "available commands");
        info!(callbacks = ?registry.callback_identifiers(), "handled callbacks");
        Self {
            registry,
            messenger,
            locks: UserLocks::default(),
            options,
        }
    }

    /// Publish the command menu built from the registry, if the messenger has one.
    pub async fn publish_commands(&self) -> Result<()> {
        if !self.messenger.capabilities().supports_command_menu {
            debug!("messenger has no command menu");
            return Ok(());
        }
        self.messenger.set_commands(self.registry.menu()).await
    }

    /// Process one update to completion.
    ///
    /// Never fails: chat-scoped errors become replies, everything else is logged.
    pub async fn handle(&self, update: IncomingUpdate) {
        let _guard = self.locks.lock_user(update.user_id()).await;
        match update {
            IncomingUpdate::Command(cmd) => self.handle_command(cmd).await,
            IncomingUpdate::Text(msg) => self.handle_text(msg).await,
            IncomingUpdate::Callback(q) => self.handle_callback(q).await,
        }
    }

    async fn handle_command(&self, cmd: CommandMessage) {
        info!(command = %cmd.name, user_id = %cmd.user_id, "received command");
        let Some(handler) = self.registry.command(&cmd.name) else {
            if self.options.reply_unsupported {
                self.send_plain(cmd.chat_id, UNSUPPORTED_COMMAND).await;
            }
            return;
        };

        let result = handler.handle_command(&cmd).await;
        self.finish(result, handler.name()).await;
    }

    async fn handle_text(&self, msg: TextMessage) {
        debug!(user_id = %msg.user_id, "received plain text");
        self.send_plain(msg.chat_id, TEXT_HINT).await;
    }

    async fn handle_callback(&self, q: CallbackQuery) {
        let identifier = callbacks::identifier_of(&q.token);
        info!(callback = identifier, user_id = %q.user_id, "received callback");

        let mut acknowledged = false;
        match self.registry.callback(identifier) {
            Some(handler) => {
                let result = handler.handle_callback(identifier, &q).await;
                if let Ok(actions) = &result {
                    acknowledged = actions.iter().any(|a| {
                        matches!(a, ReplyAction::AcknowledgeCallback { callback_id, .. } if *callback_id == q.callback_id)
                    });
                }
                self.finish(result, handler.name()).await;
            }
            None => warn!(callback = identifier, "no handler for callback"),
        }

        // The client shows a spinner until the query is answered.
        if !acknowledged {
            self.acknowledge(&q.callback_id).await;
        }
    }

    /// Answer a callback query without text. Failures are logged.
    pub async fn acknowledge(&self, callback_id: &str) {
        if let Err(e) = self.messenger.answer_callback_query(callback_id, None).await {
            warn!(callback_id, error = %e, "failed to answer callback query");
        }
    }

    async fn finish(&self, result: Result<Vec<ReplyAction>>, handler: &str) {
        match result {
            Ok(actions) => self.send_all(actions).await,
            Err(Error::Chat { chat_id, message }) => {
                warn!(handler, chat_id = %chat_id, "{message}");
                self.send_plain(chat_id, &message).await;
            }
            Err(e @ Error::Range(_)) => {
                error!(handler, error = %e, "bot-generated control out of range");
            }
            Err(e) => error!(handler, error = %e, "handler failed"),
        }
    }

    async fn send_all(&self, actions: Vec<ReplyAction>) {
        let max_token_len = self.messenger.capabilities().max_callback_data_len;
        for action in actions {
            debug!(action = action.kind(), "sending");
            for token in oversized_tokens(&action, max_token_len) {
                warn!(
                    action = action.kind(),
                    token,
                    len = token.len(),
                    max = max_token_len,
                    "callback token too long for messenger"
                );
            }
            if let Err(e) = self.execute(&action).await {
                warn!(action = action.kind(), error = %e, "request failed");
            }
        }
    }

    async fn execute(&self, action: &ReplyAction) -> Result<()> {
        let m = &self.messenger;
        match action {
            ReplyAction::SendText {
                chat_id,
                text,
                controls,
            } => {
                m.send_text(*chat_id, text, controls.as_ref()).await?;
            }
            ReplyAction::SendImage {
                chat_id,
                image_url,
                caption,
                controls,
            } => {
                m.send_image(*chat_id, image_url, caption.as_deref(), controls.as_ref())
                    .await?;
            }
            ReplyAction::EditImage {
                message,
                image_url,
                caption,
                controls,
            } => {
                m.edit_image(*message, image_url, caption.as_deref(), controls.as_ref())
                    .await?;
            }
            ReplyAction::EditText {
                message,
                text,
                controls,
            } => {
                m.edit_text(*message, text, controls.as_ref()).await?;
            }
            ReplyAction::EditControls { message, controls } => {
                m.edit_keyboard(*message, controls).await?;
            }
            ReplyAction::DeleteMessage { message } => {
                m.delete_message(*message).await?;
            }
            ReplyAction::AcknowledgeCallback { callback_id, text } => {
                m.answer_callback_query(callback_id, text.as_deref())
                    .await?;
            }
        }
        Ok(())
    }

    async fn send_plain(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text, None).await {
            warn!(chat_id = %chat_id, error = %e, "failed to send reply");
        }
    }
}

/// Tokens of the action's keyboard longer than `max` bytes.
fn oversized_tokens(action: &ReplyAction, max: usize) -> Vec<&str> {
    action
        .controls()
        .map(|kb| {
            kb.buttons()
                .map(|b| b.token.as_str())
                .filter(|t| t.len() > max)
                .collect()
        })
        .unwrap_or_default()
}
