//! Telegram update handlers.
//!
//! Each handler converts a teloxide update into an [`IncomingUpdate`] and hands
//! it to the core dispatcher. Anything the bot cannot act on is dropped here.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};
use tracing::debug;

use kk_core::{
    dispatcher::Dispatcher,
    domain::{ChatId, MessageId, UserId},
    messaging::types::{self, CommandMessage, IncomingUpdate, TextMessage},
};

pub async fn handle_callback(
    q: CallbackQuery,
    dispatcher: Arc<Dispatcher>,
) -> ResponseResult<()> {
    let message = q.message.as_ref().map(|m| (m.chat.id.0, m.id.0));
    match callback_update(&q.id, q.from.id.0, message, q.data.as_deref()) {
        Some(update) => dispatcher.handle(update).await,
        None => {
            // Too old or foreign to act on; still stop the client spinner.
            debug!(callback_id = %q.id, "callback without message or data");
            dispatcher.acknowledge(&q.id).await;
        }
    }
    Ok(())
}

pub async fn handle_message(msg: Message, dispatcher: Arc<Dispatcher>) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0);
    if let Some(update) = message_update(msg.chat.id.0, user_id, msg.text()) {
        dispatcher.handle(update).await;
    }
    Ok(())
}

fn to_user_id(raw: u64) -> Option<UserId> {
    i64::try_from(raw).ok().map(UserId)
}

/// Text message to update. Messages without a sender or text are ignored.
pub fn message_update(chat_id: i64, user_id: Option<u64>, text: Option<&str>) -> Option<IncomingUpdate> {
    let user_id = to_user_id(user_id?)?;
    let text = text?;
    let chat_id = ChatId(chat_id);

    if let Some(cmd) = CommandMessage::parse(chat_id, user_id, text) {
        return Some(IncomingUpdate::Command(cmd));
    }
    Some(IncomingUpdate::Text(TextMessage {
        chat_id,
        user_id,
        text: text.to_string(),
    }))
}

/// Button press to update. `message` is `(chat_id, message_id)` of the message
/// carrying the keyboard.
pub fn callback_update(
    callback_id: &str,
    user_id: u64,
    message: Option<(i64, i32)>,
    data: Option<&str>,
) -> Option<IncomingUpdate> {
    let (chat_id, message_id) = message?;
    let token = data.filter(|d| !d.is_empty())?;
    Some(IncomingUpdate::Callback(types::CallbackQuery {
        chat_id: ChatId(chat_id),
        user_id: to_user_id(user_id)?,
        message_id: MessageId(message_id),
        callback_id: callback_id.to_string(),
        token: token.to_string(),
    }))
}
