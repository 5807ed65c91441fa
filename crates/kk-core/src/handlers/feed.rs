//! `/start` feed: one image at a time, forward-only, with a save button.

use async_trait::async_trait;
use tracing::info;

use crate::{
    callbacks,
    domain::{Category, ChatId, ImageDescriptor},
    errors::{Error, ResultExt},
    handlers::{emoji, ChatHandler, CommandSpec, Services},
    messaging::types::{CallbackQuery, CommandMessage, InlineButton, InlineKeyboard, ReplyAction},
    Result,
};

pub const START_COMMAND: &str = "start";
pub const NEXT_CALLBACK: &str = "feed_next";
pub const SAVE_CALLBACK: &str = "feed_save";
/// Marker shown in place of the save button once saved. Does nothing.
pub const SAVED_MARK_CALLBACK: &str = "feed_saved";

const GREETING: &str = "Welcome! Use the commands from the menu.";
const NO_CATEGORY: &str = "No category selected. Pick one with /category.";
const FETCH_FAILED: &str = "Could not fetch an image.";
const SAVE_FAILED: &str = "Could not save the image.";
const CATEGORY_FAILED: &str = "Could not load your category.";
const SAVED_ACK: &str = "Image saved :)";

pub struct FeedHandler {
    services: Services,
}

impl FeedHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    async fn start(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        let existing = self
            .services
            .find_category(cmd.user_id)
            .await
            .or_chat(cmd.chat_id, CATEGORY_FAILED)?;

        match existing {
            None => {
                info!(user_id = %cmd.user_id, "new user");
                let category = self
                    .services
                    .set_default_category(cmd.user_id)
                    .await
                    .or_chat(cmd.chat_id, CATEGORY_FAILED)?;
                let feed = self.feed_message(cmd.chat_id, &category).await?;
                Ok(vec![ReplyAction::text(cmd.chat_id, GREETING), feed])
            }
            Some(category) => {
                info!(user_id = %cmd.user_id, category = %category.name, "start feed");
                Ok(vec![self.feed_message(cmd.chat_id, &category).await?])
            }
        }
    }

    async fn advance(&self, q: &CallbackQuery) -> Result<Vec<ReplyAction>> {
        info!(user_id = %q.user_id, "next feed image");
        let category = self
            .services
            .find_category(q.user_id)
            .await
            .or_chat(q.chat_id, CATEGORY_FAILED)?
            .ok_or_else(|| Error::chat(q.chat_id, NO_CATEGORY))?;

        let image = self.fetch(q.chat_id, &category).await?;
        Ok(vec![ReplyAction::EditImage {
            message: q.message(),
            image_url: image.image_url.clone(),
            caption: Some(caption(&category, &image)),
            controls: Some(feed_keyboard(&image)),
        }])
    }

    async fn save(&self, q: &CallbackQuery) -> Result<Vec<ReplyAction>> {
        let external_id = callbacks::require_data(&q.token)?;

        let image = self
            .services
            .image_by_id(external_id)
            .await
            .or_chat(q.chat_id, SAVE_FAILED)?;
        let saved = self
            .services
            .save_image(q.user_id, &image)
            .await
            .or_chat(q.chat_id, SAVE_FAILED)?;

        info!(user_id = %q.user_id, external_id, saved_id = %saved.id, "saved image");
        Ok(vec![
            ReplyAction::ack(&q.callback_id, SAVED_ACK),
            ReplyAction::EditControls {
                message: q.message(),
                controls: saved_keyboard(),
            },
        ])
    }

    async fn feed_message(&self, chat_id: ChatId, category: &Category) -> Result<ReplyAction> {
        let image = self.fetch(chat_id, category).await?;
        Ok(ReplyAction::SendImage {
            chat_id,
            image_url: image.image_url.clone(),
            caption: Some(caption(category, &image)),
            controls: Some(feed_keyboard(&image)),
        })
    }

    async fn fetch(&self, chat_id: ChatId, category: &Category) -> Result<ImageDescriptor> {
        self.services
            .next_image(category)
            .await
            .or_chat(chat_id, FETCH_FAILED)
    }
}

#[async_trait]
impl ChatHandler for FeedHandler {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn commands(&self) -> &'static [CommandSpec] {
        &[CommandSpec {
            name: START_COMMAND,
            description: "Start the feed",
        }]
    }

    fn callbacks(&self) -> &'static [&'static str] {
        &[NEXT_CALLBACK, SAVE_CALLBACK, SAVED_MARK_CALLBACK]
    }

    async fn handle_command(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        match cmd.name.as_str() {
            START_COMMAND => self.start(cmd).await,
            other => Err(Error::External(format!("feed: unexpected command {other:?}"))),
        }
    }

    async fn handle_callback(
        &self,
        identifier: &str,
        q: &CallbackQuery,
    ) -> Result<Vec<ReplyAction>> {
        match identifier {
            NEXT_CALLBACK => self.advance(q).await,
            SAVE_CALLBACK => self.save(q).await,
            SAVED_MARK_CALLBACK => Ok(Vec::new()),
            other => Err(Error::External(format!("feed: unexpected callback {other:?}"))),
        }
    }
}

fn caption(category: &Category, image: &ImageDescriptor) -> String {
    format!(
        "Current category: {}\nImage tag: {}",
        category.name, image.category_name
    )
}

fn next_button() -> InlineButton {
    InlineButton::new("Next", callbacks::encode(NEXT_CALLBACK, None))
}

fn feed_keyboard(image: &ImageDescriptor) -> InlineKeyboard {
    InlineKeyboard::new().row(vec![
        InlineButton::new(
            format!("{} Save", emoji::HEART),
            callbacks::encode(SAVE_CALLBACK, Some(image.external_id.as_str())),
        ),
        next_button(),
    ])
}

fn saved_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(vec![
        InlineButton::new(
            format!("{} Saved", emoji::THUMBS_UP),
            callbacks::encode(SAVED_MARK_CALLBACK, None),
        ),
        next_button(),
    ])
}
