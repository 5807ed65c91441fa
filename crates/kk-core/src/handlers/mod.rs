//! Feature handlers.
//!
//! Each handler owns a disjoint set of command names and callback identifiers
//! and turns one inbound event into an ordered list of [`ReplyAction`]s. They
//! never talk to the messenger directly; the dispatcher executes the actions.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{Category, ImageDescriptor, SavedId, SavedImage, UserId},
    errors::Error,
    messaging::types::{CallbackQuery, CommandMessage, ReplyAction},
    ports::{CategoryStore, ImageSource, SavedStore},
    Result,
};

pub mod category;
pub mod clear;
pub mod feed;
pub mod registry;
pub mod saved;

pub use category::CategoryHandler;
pub use clear::ClearHandler;
pub use feed::FeedHandler;
pub use registry::HandlerRegistry;
pub use saved::SavedHandler;

/// A command a handler answers to, with its menu description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
}

#[async_trait]
pub trait ChatHandler: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &'static str;

    fn commands(&self) -> &'static [CommandSpec] {
        &[]
    }

    fn callbacks(&self) -> &'static [&'static str] {
        &[]
    }

    /// Called only for names listed in [`ChatHandler::commands`].
    async fn handle_command(&self, cmd: &CommandMessage) -> Result<Vec<ReplyAction>> {
        Err(Error::External(format!(
            "{} does not handle command {:?}",
            self.name(),
            cmd.name
        )))
    }

    /// Called only for identifiers listed in [`ChatHandler::callbacks`].
    async fn handle_callback(
        &self,
        identifier: &str,
        q: &CallbackQuery,
    ) -> Result<Vec<ReplyAction>> {
        let _ = q;
        Err(Error::External(format!(
            "{} does not handle callback {identifier:?}",
            self.name()
        )))
    }
}

pub(crate) mod emoji {
    pub const LEFT_ARROW: &str = "\u{2B05}\u{FE0F}";
    pub const RIGHT_ARROW: &str = "\u{27A1}\u{FE0F}";
    pub const CANCEL: &str = "\u{274C}";
    pub const HEART: &str = "\u{2764}\u{FE0F}";
    pub const BROKEN_HEART: &str = "\u{1F494}";
    pub const THUMBS_UP: &str = "\u{1F44D}";
    pub const DISAPPOINTED_FACE: &str = "\u{1F61E}";
}

/// The ports every handler works against, with a bound on each call.
#[derive(Clone)]
pub struct Services {
    pub categories: Arc<dyn CategoryStore>,
    pub saved: Arc<dyn SavedStore>,
    pub images: Arc<dyn ImageSource>,
    pub timeout: Duration,
}

impl Services {
    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout(format!(
                "{what} exceeded {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    pub async fn find_category(&self, user_id: UserId) -> Result<Option<Category>> {
        self.bounded("category lookup", self.categories.get(user_id))
            .await
    }

    pub async fn set_default_category(&self, user_id: UserId) -> Result<Category> {
        self.bounded("category init", self.categories.set_default(user_id))
            .await
    }

    pub async fn update_category(&self, user_id: UserId, name: &str) -> Result<Category> {
        self.bounded("category update", self.categories.update(user_id, name))
            .await
    }

    pub async fn next_image(&self, category: &Category) -> Result<ImageDescriptor> {
        self.bounded("image poll", self.images.poll_next(category))
            .await
    }

    pub async fn image_by_id(&self, external_id: &str) -> Result<ImageDescriptor> {
        self.bounded("image lookup", self.images.get_by_external_id(external_id))
            .await
    }

    pub async fn save_image(
        &self,
        user_id: UserId,
        image: &ImageDescriptor,
    ) -> Result<SavedImage> {
        self.bounded("saved insert", self.saved.save(user_id, image))
            .await
    }

    pub async fn list_saved(&self, user_id: UserId) -> Result<Vec<SavedImage>> {
        self.bounded("saved list", self.saved.list_ordered(user_id))
            .await
    }

    pub async fn has_saved(&self, user_id: UserId) -> Result<bool> {
        self.bounded("saved exists", self.saved.exists_for_user(user_id))
            .await
    }

    pub async fn delete_saved(&self, id: SavedId) -> Result<bool> {
        self.bounded("saved delete", self.saved.delete_by_id(id))
            .await
    }

    pub async fn clear_saved(&self, user_id: UserId) -> Result<usize> {
        self.bounded("saved clear", self.saved.delete_all_for_user(user_id))
            .await
    }
}
