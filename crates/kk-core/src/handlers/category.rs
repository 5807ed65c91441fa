//! `/category`: paged picker over the fixed category catalog.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    callbacks,
    errors::{Error, ResultExt},
    handlers::{emoji, ChatHandler, CommandSpec, Services},
    messaging::types::{CallbackQuery, CommandMessage, InlineButton, InlineKeyboard, ReplyAction},
    paging::CategoryPage,
    ports::CategoryCatalog,
    Result,
};

pub const CATEGORY_COMMAND: &str = "category";
pub const SET_PAGE_CALLBACK: &str = "category_page";
pub const UPDATE_CATEGORY_CALLBACK: &str = "category_update";
pub const CANCEL_CALLBACK: &str = "category_cancel";

const UPDATE_FAILED: &str = "Could not update the category.";

pub struct CategoryHandler {
    services: Services,
    catalog: Arc<CategoryCatalog>,
    page_size: usize,
}

impl CategoryHandler {
    pub fn new(services: Services, catalog: Arc<CategoryCatalog>, page_size: usize) -> Self {
        Self {
            services,
            catalog,
            page_size: page_size.max(1),
        }
    }

    pub fn page_count(&self) -> usize {
        crate::paging::page_count(self.catalog.len(), self.page_size)
    }

    /// Text and keyboard of one picker page.
    ///
    /// Pages are only requested through our own buttons, so an out-of-range
    /// page is a defect (`Error::Range`), not a user error.
    pub fn render_page(&self, page: i64) -> Result<(String, InlineKeyboard)> {
        let page = CategoryPage::at(self.catalog.len(), self.page_size, page)?;
        let text = format!("Page {} / {}", page.page + 1, page.page_count);

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

        let mut keyboard = InlineKeyboard::new().row(nav);
        for name in &self.catalog.names()[page.start..page.end] {
            keyboard = keyboard.row(vec![InlineButton::new(
                name.as_str(),
                callbacks::encode(UPDATE_CATEGORY_CALLBACK, Some(name.as_str())),
            )]);
        }
        keyboard = keyboard.row(vec![InlineButton::new(
            format!("{} Cancel", emoji::CANCEL),
            callbacks::encode(CANCEL_CALLBACK, None),
        )]);

        Ok((text, keyboard))
    }

    fn show(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        let (text, keyboard) = self.render_page(0)?;
        Ok(vec![ReplyAction::SendText {
            chat_id: cmd.chat_id,
            text,
            controls: Some(keyboard),
        }])
    }

    fn set_page(&self, q: &CallbackQuery) -> Result<Vec<ReplyAction>> {
        let page = callbacks::parse_data::<i64>(&q.token)?;
        let (text, keyboard) = self.render_page(page)?;
        Ok(vec![ReplyAction::EditText {
            message: q.message(),
            text,
            controls: Some(keyboard),
        }])
    }

    async fn update_category(&self, q: &CallbackQuery) -> Result<Vec<ReplyAction>> {
        let name = callbacks::require_data(&q.token)?;
        let category = self
            .services
            .update_category(q.user_id, name)
            .await
            .or_chat(q.chat_id, UPDATE_FAILED)?;

        info!(user_id = %q.user_id, category = %category.name, "category updated");
        Ok(vec![ReplyAction::ack(
            &q.callback_id,
            format!("Category updated, now: {}", category.name),
        )])
    }

    fn cancel(&self, q: &CallbackQuery) -> Vec<ReplyAction> {
        info!(user_id = %q.user_id, "category picker cancelled");
        vec![ReplyAction::DeleteMessage {
            message: q.message(),
        }]
    }
}

#[async_trait]
impl ChatHandler for CategoryHandler {
    fn name(&self) -> &'static str {
        "category"
    }

    fn commands(&self) -> &'static [CommandSpec] {
        &[CommandSpec {
            name: CATEGORY_COMMAND,
            description: "Choose a category",
        }]
    }

    fn callbacks(&self) -> &'static [&'static str] {
        &[SET_PAGE_CALLBACK, UPDATE_CATEGORY_CALLBACK, CANCEL_CALLBACK]
    }

    async fn handle_command(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        match cmd.name.as_str() {
            CATEGORY_COMMAND => self.show(cmd),
            other => Err(Error::External(format!(
                "category: unexpected command {other:?}"
            ))),
        }
    }

    async fn handle_callback(
        &self,
        identifier: &str,
        q: &CallbackQuery,
    ) -> Result<Vec<ReplyAction>> {
        match identifier {
            SET_PAGE_CALLBACK => self.set_page(q),
            UPDATE_CATEGORY_CALLBACK => self.update_category(q).await,
            CANCEL_CALLBACK => Ok(self.cancel(q)),
            other => Err(Error::External(format!(
                "category: unexpected callback {other:?}"
            ))),
        }
    }
}
