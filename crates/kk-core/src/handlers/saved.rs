//! `/saved`: browse the saved collection one image per page, remove images.
//!
//! Page index == list index into the collection ordered by creation time. The
//! list is re-read from storage on every navigation. Removal buttons carry the
//! durable row id, not the index, so a stale button can never remove a
//! different image than the one it was rendered under.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    callbacks,
    domain::{ChatId, MessageRef, SavedId, SavedImage},
    errors::{Error, ResultExt},
    handlers::{emoji, ChatHandler, CommandSpec, Services},
    messaging::types::{CallbackQuery, CommandMessage, InlineButton, InlineKeyboard, ReplyAction},
    paging::{self, SavedPage},
    Result,
};

pub const SAVED_COMMAND: &str = "saved";
pub const SET_PAGE_CALLBACK: &str = "saved_page";
pub const REMOVE_CALLBACK: &str = "saved_remove";

const EMPTY: &str = "Your collection is empty.";
const LOAD_FAILED: &str = "Failed to load the page.";
const REMOVE_FAILED: &str = "Failed to remove the image.";
const REMOVED_ACK: &str = "Image removed from your collection";

pub struct SavedHandler {
    services: Services,
}

impl SavedHandler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    async fn show(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        let has_any = self
            .services
            .has_saved(cmd.user_id)
            .await
            .or_chat(cmd.chat_id, LOAD_FAILED)?;
        if !has_any {
            info!(user_id = %cmd.user_id, "no saved images");
            return Ok(vec![empty_message(cmd.chat_id)]);
        }

        let saved = self
            .services
            .list_saved(cmd.user_id)
            .await
            .or_chat(cmd.chat_id, LOAD_FAILED)?;
        // Cleared between the two reads.
        let Some(first) = saved.first() else {
            return Ok(vec![empty_message(cmd.chat_id)]);
        };
        let page = SavedPage::at(saved.len(), 0)?;

        info!(user_id = %cmd.user_id, total = saved.len(), "show saved");
        Ok(vec![ReplyAction::SendImage {
            chat_id: cmd.chat_id,
            image_url: first.image_url.clone(),
            caption: Some(caption(&page, first)),
            controls: Some(keyboard(&page, first.id)),
        }])
    }

    async fn set_page(&self, q: &CallbackQuery) -> Result<Vec<ReplyAction>> {
        let index = callbacks::parse_data::<usize>(&q.token).or_chat(q.chat_id, LOAD_FAILED)?;
        let saved = self
            .services
            .list_saved(q.user_id)
            .await
            .or_chat(q.chat_id, LOAD_FAILED)?;
        let page = SavedPage::at(saved.len(), index).or_chat(q.chat_id, LOAD_FAILED)?;

        info!(user_id = %q.user_id, page = index, "set saved page");
        Ok(vec![render(q.message(), &page, &saved[page.index])])
    }

    async fn remove(&self, q: &CallbackQuery) -> Result<Vec<ReplyAction>> {
        let id = SavedId(callbacks::parse_data::<i64>(&q.token).or_chat(q.chat_id, REMOVE_FAILED)?);

        let saved = self
            .services
            .list_saved(q.user_id)
            .await
            .or_chat(q.chat_id, REMOVE_FAILED)?;
        let position = saved.iter().position(|s| s.id == id).ok_or_else(|| {
            warn!(user_id = %q.user_id, saved_id = %id, "remove target not in collection");
            Error::chat(q.chat_id, REMOVE_FAILED)
        })?;

        self.services
            .delete_saved(id)
            .await
            .or_chat(q.chat_id, REMOVE_FAILED)?;
        info!(user_id = %q.user_id, saved_id = %id, position, "removed saved image");

        let remaining: Vec<SavedImage> = saved.into_iter().filter(|s| s.id != id).collect();
        let len_before = remaining.len() + 1;

        let mut actions = vec![ReplyAction::ack(&q.callback_id, REMOVED_ACK)];
        match paging::index_after_removal(position, len_before) {
            None => {
                actions.push(ReplyAction::DeleteMessage {
                    message: q.message(),
                });
                actions.push(empty_message(q.chat_id));
            }
            Some(index) => {
                let page = SavedPage::at(remaining.len(), index)?;
                actions.push(render(q.message(), &page, &remaining[page.index]));
            }
        }
        Ok(actions)
    }
}

#[async_trait]
impl ChatHandler for SavedHandler {
    fn name(&self) -> &'static str {
        "saved"
    }

    fn commands(&self) -> &'static [CommandSpec] {
        &[CommandSpec {
            name: SAVED_COMMAND,
            description: "My collection",
        }]
    }

    fn callbacks(&self) -> &'static [&'static str] {
        &[SET_PAGE_CALLBACK, REMOVE_CALLBACK]
    }

    async fn handle_command(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        match cmd.name.as_str() {
            SAVED_COMMAND => self.show(cmd).await,
            other => Err(Error::External(format!("saved: unexpected command {other:?}"))),
        }
    }

    async fn handle_callback(
        &self,
        identifier: &str,
        q: &CallbackQuery,
    ) -> Result<Vec<ReplyAction>> {
        match identifier {
            SET_PAGE_CALLBACK => self.set_page(q).await,
            REMOVE_CALLBACK => self.remove(q).await,
            other => Err(Error::External(format!("saved: unexpected callback {other:?}"))),
        }
    }
}

fn empty_message(chat_id: ChatId) -> ReplyAction {
    ReplyAction::text(chat_id, EMPTY)
}

fn render(message: MessageRef, page: &SavedPage, item: &SavedImage) -> ReplyAction {
    ReplyAction::EditImage {
        message,
        image_url: item.image_url.clone(),
        caption: Some(caption(page, item)),
        controls: Some(keyboard(page, item.id)),
    }
}

fn caption(page: &SavedPage, item: &SavedImage) -> String {
    format!("{} / {} · {}", page.index + 1, page.total, item.category_name)
}

fn keyboard(page: &SavedPage, shown: SavedId) -> InlineKeyboard {
    let mut nav = Vec::new();
    if let Some(prev) = page.prev() {
        nav.push(InlineButton::new(
            emoji::LEFT_ARROW,
            callbacks::encode(SET_PAGE_CALLBACK, Some(prev.to_string().as_str())),
        ));
    }
    if let Some(next) = page.next() {
        nav.push(InlineButton::new(
            emoji::RIGHT_ARROW,
            callbacks::encode(SET_PAGE_CALLBACK, Some(next.to_string().as_str())),
        ));
    }

    InlineKeyboard::new().row(nav).row(vec![InlineButton::new(
        format!("{} Don't like it anymore", emoji::BROKEN_HEART),
        callbacks::encode(REMOVE_CALLBACK, Some(shown.0.to_string().as_str())),
    )])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::UserId;
    use crate::testing::{callback, command, image, services_with, BrokenSavedStore, ScriptedImages};

    async fn handler_with(items: &[&str]) -> (SavedHandler, Services, Vec<SavedImage>) {
        let services = services_with(Arc::new(ScriptedImages::new()), &["maid"]);
        let mut saved = Vec::new();
        for id in items {
            saved.push(
                services
                    .save_image(UserId(1), &image(id, "maid"))
                    .await
                    .unwrap(),
            );
        }
        (SavedHandler::new(services.clone()), services, saved)
    }

    fn remove_token(item: &SavedImage) -> String {
        callbacks::encode(REMOVE_CALLBACK, Some(item.id.0.to_string().as_str()))
    }

    fn shown_url(action: &ReplyAction) -> &str {
        match action {
            ReplyAction::EditImage { image_url, .. } | ReplyAction::SendImage { image_url, .. } => {
                image_url.as_str()
            }
            other => panic!("not an image action: {other:?}"),
        }
    }

    fn shown_controls(action: &ReplyAction) -> &InlineKeyboard {
        match action {
            ReplyAction::EditImage {
                controls: Some(c), ..
            }
            | ReplyAction::SendImage {
                controls: Some(c), ..
            } => c,
            other => panic!("no controls: {other:?}"),
        }
    }

    async fn remaining_ids(services: &Services) -> Vec<String> {
        services
            .list_saved(UserId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.external_id)
            .collect()
    }

    #[tokio::test]
    async fn show_empty_collection() {
        let (handler, _, _) = handler_with(&[]).await;
        let actions = handler.handle_command(&command(1, "/saved")).await.unwrap();
        assert_eq!(actions, vec![ReplyAction::text(ChatId(1), EMPTY)]);
    }

    #[tokio::test]
    async fn show_renders_first_item_with_next_and_remove() {
        let (handler, _, saved) = handler_with(&["a", "b", "c"]).await;
        let actions = handler.handle_command(&command(1, "/saved")).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(shown_url(&actions[0]), "https://img.example/a.jpg");

        let controls = shown_controls(&actions[0]);
        let tokens: Vec<_> = controls.buttons().map(|b| b.token.clone()).collect();
        assert_eq!(tokens, vec!["saved_page.1".to_string(), remove_token(&saved[0])]);
    }

    #[tokio::test]
    async fn set_page_renders_requested_index() {
        let (handler, _, saved) = handler_with(&["a", "b", "c"]).await;
        let actions = handler
            .handle_callback(SET_PAGE_CALLBACK, &callback(1, "saved_page.2"))
            .await
            .unwrap();
        assert_eq!(shown_url(&actions[0]), "https://img.example/c.jpg");
        let tokens: Vec<_> = shown_controls(&actions[0])
            .buttons()
            .map(|b| b.token.clone())
            .collect();
        assert_eq!(tokens, vec!["saved_page.1".to_string(), remove_token(&saved[2])]);
    }

    #[tokio::test]
    async fn set_page_failures_are_chat_errors() {
        let (handler, _, _) = handler_with(&["a"]).await;
        for token in ["saved_page", "saved_page.x", "saved_page.5"] {
            let err = handler
                .handle_callback(SET_PAGE_CALLBACK, &callback(1, token))
                .await
                .unwrap_err();
            assert!(
                matches!(&err, Error::Chat { message, .. } if message == LOAD_FAILED),
                "{token}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn removing_first_shows_next_item_at_same_index() {
        let (handler, services, saved) = handler_with(&["a", "b", "c"]).await;
        let actions = handler
            .handle_callback(REMOVE_CALLBACK, &callback(1, &remove_token(&saved[0])))
            .await
            .unwrap();

        assert!(matches!(&actions[0], ReplyAction::AcknowledgeCallback { .. }));
        assert_eq!(shown_url(&actions[1]), "https://img.example/b.jpg");
        assert!(matches!(
            &actions[1],
            ReplyAction::EditImage { caption: Some(c), .. } if c.starts_with("1 / 2")
        ));
        assert_eq!(remaining_ids(&services).await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn removing_last_clamps_to_previous_item() {
        let (handler, services, saved) = handler_with(&["a", "b", "c"]).await;
        let actions = handler
            .handle_callback(REMOVE_CALLBACK, &callback(1, &remove_token(&saved[2])))
            .await
            .unwrap();

        assert_eq!(shown_url(&actions[1]), "https://img.example/b.jpg");
        assert!(matches!(
            &actions[1],
            ReplyAction::EditImage { caption: Some(c), .. } if c.starts_with("2 / 2")
        ));
        // b is now last: previous control only.
        let tokens: Vec<_> = shown_controls(&actions[1])
            .buttons()
            .map(|b| b.token.clone())
            .collect();
        assert_eq!(tokens, vec!["saved_page.0".to_string(), remove_token(&saved[1])]);
        assert_eq!(remaining_ids(&services).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn removing_middle_keeps_index() {
        let (handler, _, saved) = handler_with(&["a", "b", "c"]).await;
        let actions = handler
            .handle_callback(REMOVE_CALLBACK, &callback(1, &remove_token(&saved[1])))
            .await
            .unwrap();
        assert_eq!(shown_url(&actions[1]), "https://img.example/c.jpg");
    }

    #[tokio::test]
    async fn removing_sole_item_switches_to_empty_state() {
        let (handler, services, saved) = handler_with(&["a"]).await;
        let q = callback(1, &remove_token(&saved[0]));
        let actions = handler.handle_callback(REMOVE_CALLBACK, &q).await.unwrap();

        assert_eq!(
            actions,
            vec![
                ReplyAction::ack(&q.callback_id, REMOVED_ACK),
                ReplyAction::DeleteMessage {
                    message: q.message()
                },
                ReplyAction::text(ChatId(1), EMPTY),
            ]
        );
        assert!(!services.has_saved(UserId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn removing_unknown_id_is_a_chat_error() {
        let (handler, services, saved) = handler_with(&["a", "b"]).await;
        let q = callback(1, &remove_token(&saved[0]));
        handler.handle_callback(REMOVE_CALLBACK, &q).await.unwrap();

        // Same stale button pressed again.
        let err = handler
            .handle_callback(REMOVE_CALLBACK, &q)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Chat { message, .. } if message == REMOVE_FAILED));
        assert_eq!(remaining_ids(&services).await, vec!["b"]);
    }

    #[tokio::test]
    async fn storage_failure_on_remove_is_a_chat_error() {
        let mut services = services_with(Arc::new(ScriptedImages::new()), &["maid"]);
        services.saved = Arc::new(BrokenSavedStore);
        let handler = SavedHandler::new(services);

        let err = handler
            .handle_callback(REMOVE_CALLBACK, &callback(1, "saved_remove.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Chat { message, .. } if message == REMOVE_FAILED));
    }
}
