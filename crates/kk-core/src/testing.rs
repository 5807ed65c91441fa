//! Fakes shared by the unit tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{Category, ChatId, ImageDescriptor, MessageId, MessageRef, SavedId, SavedImage, UserId},
    errors::Error,
    handlers::Services,
    messaging::{
        port::MessagingPort,
        types::{BotCommandInfo, InlineKeyboard, MessagingCapabilities, ReplyAction},
    },
    ports::{CategoryCatalog, ImageSource, SavedStore},
    store::{MemoryCategoryStore, MemorySavedStore},
    Result,
};

/// Image source that hands out `img-1`, `img-2`, ... in order.
#[derive(Default)]
pub struct ScriptedImages {
    polled: AtomicUsize,
    fail: AtomicBool,
    delay: Mutex<Duration>,
}

impl ScriptedImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn polled(&self) -> usize {
        self.polled.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

pub fn image(external_id: &str, category: &str) -> ImageDescriptor {
    ImageDescriptor {
        external_id: external_id.to_string(),
        image_url: format!("https://img.example/{external_id}.jpg"),
        category_name: category.to_string(),
    }
}

#[async_trait]
impl ImageSource for ScriptedImages {
    async fn poll_next(&self, category: &Category) -> Result<ImageDescriptor> {
        self.pause().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Fetch("HTTP error: 503".to_string()));
        }
        let n = self.polled.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(image(&format!("img-{n}"), &category.name))
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<ImageDescriptor> {
        self.pause().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Fetch("HTTP error: 404".to_string()));
        }
        Ok(image(external_id, "maid"))
    }
}

/// Saved store whose every call fails.
pub struct BrokenSavedStore;

#[async_trait]
impl SavedStore for BrokenSavedStore {
    async fn save(&self, _user_id: UserId, _image: &ImageDescriptor) -> Result<SavedImage> {
        Err(Error::Storage("database is locked".to_string()))
    }

    async fn list_ordered(&self, _user_id: UserId) -> Result<Vec<SavedImage>> {
        Err(Error::Storage("database is locked".to_string()))
    }

    async fn exists_for_user(&self, _user_id: UserId) -> Result<bool> {
        Err(Error::Storage("database is locked".to_string()))
    }

    async fn delete_by_id(&self, _id: SavedId) -> Result<bool> {
        Err(Error::Storage("database is locked".to_string()))
    }

    async fn delete_all_for_user(&self, _user_id: UserId) -> Result<usize> {
        Err(Error::Storage("database is locked".to_string()))
    }
}

pub fn catalog(names: &[&str]) -> Arc<CategoryCatalog> {
    Arc::new(CategoryCatalog::new(names.iter().map(|s| s.to_string()).collect()).unwrap())
}

pub fn services_with(images: Arc<ScriptedImages>, categories: &[&str]) -> Services {
    Services {
        categories: Arc::new(MemoryCategoryStore::new(catalog(categories))),
        saved: Arc::new(MemorySavedStore::new()),
        images,
        timeout: Duration::from_secs(1),
    }
}

pub fn callback(user: i64, token: &str) -> crate::messaging::types::CallbackQuery {
    crate::messaging::types::CallbackQuery {
        chat_id: ChatId(user),
        user_id: UserId(user),
        message_id: MessageId(100),
        callback_id: format!("cb-{user}"),
        token: token.to_string(),
    }
}

pub fn command(user: i64, text: &str) -> crate::messaging::types::CommandMessage {
    crate::messaging::types::CommandMessage::parse(ChatId(user), UserId(user), text).unwrap()
}

/// Messenger that records every call as the equivalent [`ReplyAction`].
#[derive(Default)]
pub struct RecordingMessenger {
    next_id: Mutex<i32>,
    sent: Mutex<Vec<ReplyAction>>,
    commands: Mutex<Vec<BotCommandInfo>>,
    fail_edits: AtomicBool,
    no_command_menu: AtomicBool,
    fail_acks: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ReplyAction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn commands(&self) -> Vec<BotCommandInfo> {
        self.commands.lock().unwrap().clone()
    }

    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_acks(&self, fail: bool) {
        self.fail_acks.store(fail, Ordering::SeqCst);
    }

    pub fn set_command_menu(&self, supported: bool) {
        self.no_command_menu.store(!supported, Ordering::SeqCst);
    }

    pub fn acks(&self) -> usize {
        self.sent()
            .iter()
            .filter(|a| matches!(a, ReplyAction::AcknowledgeCallback { .. }))
            .count()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }

    fn record(&self, action: ReplyAction) {
        self.sent.lock().unwrap().push(action);
    }

    fn edit_result(&self) -> Result<()> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(Error::External("message is not modified".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_command_menu: !self.no_command_menu.load(Ordering::SeqCst),
            max_callback_data_len: 64,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        self.record(ReplyAction::SendText {
            chat_id,
            text: text.to_string(),
            controls: keyboard.cloned(),
        });
        Ok(self.alloc(chat_id))
    }

    async fn send_image(
        &self,
        chat_id: ChatId,
        image_url: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        self.record(ReplyAction::SendImage {
            chat_id,
            image_url: image_url.to_string(),
            caption: caption.map(str::to_string),
            controls: keyboard.cloned(),
        });
        Ok(self.alloc(chat_id))
    }

    async fn edit_image(
        &self,
        msg: MessageRef,
        image_url: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        self.record(ReplyAction::EditImage {
            message: msg,
            image_url: image_url.to_string(),
            caption: caption.map(str::to_string),
            controls: keyboard.cloned(),
        });
        self.edit_result()
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        self.record(ReplyAction::EditText {
            message: msg,
            text: text.to_string(),
            controls: keyboard.cloned(),
        });
        self.edit_result()
    }

    async fn edit_keyboard(&self, msg: MessageRef, keyboard: &InlineKeyboard) -> Result<()> {
        self.record(ReplyAction::EditControls {
            message: msg,
            controls: keyboard.clone(),
        });
        self.edit_result()
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.record(ReplyAction::DeleteMessage { message: msg });
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.record(ReplyAction::AcknowledgeCallback {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        if self.fail_acks.load(Ordering::SeqCst) {
            return Err(Error::External("query is too old".to_string()));
        }
        Ok(())
    }

    async fn set_commands(&self, commands: &[BotCommandInfo]) -> Result<()> {
        *self.commands.lock().unwrap() = commands.to_vec();
        Ok(())
    }
}
