//! Telegram adapter (teloxide).
//!
//! This crate implements the `kk-core` MessagingPort over Telegram Bot API.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{
        BotCommand, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia,
        InputMediaPhoto,
    },
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use kk_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{BotCommandInfo, InlineKeyboard, MessagingCapabilities},
    },
    Result,
};

/// Telegram rejects callback data longer than this many bytes.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    fn photo(image_url: &str) -> Result<InputFile> {
        let url = reqwest::Url::parse(image_url)
            .map_err(|e| Error::Validation(format!("bad image url {image_url:?}: {e}")))?;
        Ok(InputFile::url(url))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

/// Convert rows of buttons to Telegram markup.
pub fn to_markup(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.token.clone()))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_command_menu: true,
            max_callback_data_len: MAX_CALLBACK_DATA_LEN,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        let markup = keyboard.map(to_markup);
        let msg = self
            .with_retry(|| {
                let req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
                match markup.clone() {
                    Some(m) => req.reply_markup(m),
                    None => req,
                }
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_image(
        &self,
        chat_id: ChatId,
        image_url: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        let photo = Self::photo(image_url)?;
        let markup = keyboard.map(to_markup);
        let msg = self
            .with_retry(|| {
                let mut req = self.bot.send_photo(Self::tg_chat(chat_id), photo.clone());
                if let Some(c) = caption {
                    req = req.caption(c.to_string());
                }
                if let Some(m) = markup.clone() {
                    req = req.reply_markup(m);
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_image(
        &self,
        msg: MessageRef,
        image_url: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        let mut media = InputMediaPhoto::new(Self::photo(image_url)?);
        if let Some(c) = caption {
            media = media.caption(c.to_string());
        }
        let markup = keyboard.map(to_markup);
        self.with_retry(|| {
            let mut req = self.bot.edit_message_media(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                InputMedia::Photo(media.clone()),
            );
            if let Some(m) = markup.clone() {
                req = req.reply_markup(m);
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        let markup = keyboard.map(to_markup);
        self.with_retry(|| {
            let mut req = self.bot.edit_message_text(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                text.to_string(),
            );
            if let Some(m) = markup.clone() {
                req = req.reply_markup(m);
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn edit_keyboard(&self, msg: MessageRef, keyboard: &InlineKeyboard) -> Result<()> {
        let markup = to_markup(keyboard);
        self.with_retry(|| {
            self.bot
                .edit_message_reply_markup(
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.message_id),
                )
                .reply_markup(markup.clone())
        })
        .await?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn set_commands(&self, commands: &[BotCommandInfo]) -> Result<()> {
        let commands: Vec<BotCommand> = commands
            .iter()
            .map(|c| BotCommand::new(c.name.clone(), c.description.clone()))
            .collect();
        self.with_retry(|| self.bot.set_my_commands(commands.clone()))
            .await?;
        Ok(())
    }
}
