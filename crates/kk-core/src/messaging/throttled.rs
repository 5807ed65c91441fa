use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{BotCommandInfo, InlineKeyboard, MessagingCapabilities},
    },
    Result,
};

/// Spacing applied to outbound calls. Loaded from `THROTTLE_GLOBAL_MS` and
/// `THROTTLE_PER_CHAT_MS`.
#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Between any two calls, acknowledgements and the menu included.
    pub global_min_interval: Duration,
    /// Between two calls that touch the same chat.
    pub per_chat_min_interval: Duration,
}

/// Hands out evenly spaced time slots.
#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Claim the earliest free slot; returns how long to sleep until it.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let slot = self.next.max(now);
        self.next = slot + self.interval;
        slot - now
    }
}

/// MessagingPort decorator that spaces out outbound calls.
///
/// A saved-collection turn can ack, swap the photo and redraw the keyboard
/// of one message in quick succession; spacing them per chat keeps the bot
/// under Telegram's flood limits.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<ChatId, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: ChatId) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        // Forget chats whose next slot has already passed and nobody is using.
        let now = Instant::now();
        map.retain(|_, lim| {
            let pending = lim.try_lock().map_or(true, |l| l.next > now);
            Arc::strong_count(lim) > 1 || pending
        });
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        let global = self.global.lock().await.reserve();
        let limiter = self.limiter_for_chat(chat_id).await;
        let per_chat = limiter.lock().await.reserve();
        pause(global.max(per_chat)).await;
    }

    async fn throttle_global(&self) {
        let global = self.global.lock().await.reserve();
        pause(global).await;
    }
}

async fn pause(wait: Duration) {
    if !wait.is_zero() {
        sleep(wait).await;
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_text(chat_id, text, keyboard).await
    }

    async fn send_image(
        &self,
        chat_id: ChatId,
        image_url: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner
            .send_image(chat_id, image_url, caption, keyboard)
            .await
    }

    async fn edit_image(
        &self,
        msg: MessageRef,
        image_url: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        self.throttle_chat(msg.chat_id).await;
        self.inner.edit_image(msg, image_url, caption, keyboard).await
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        self.throttle_chat(msg.chat_id).await;
        self.inner.edit_text(msg, text, keyboard).await
    }

    async fn edit_keyboard(&self, msg: MessageRef, keyboard: &InlineKeyboard) -> Result<()> {
        self.throttle_chat(msg.chat_id).await;
        self.inner.edit_keyboard(msg, keyboard).await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.throttle_chat(msg.chat_id).await;
        self.inner.delete_message(msg).await
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        // No chat_id available here; apply global throttling only.
        self.throttle_global().await;
        self.inner.answer_callback_query(callback_id, text).await
    }

    async fn set_commands(&self, commands: &[BotCommandInfo]) -> Result<()> {
        self.throttle_global().await;
        self.inner.set_commands(commands).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMessenger;

    #[tokio::test]
    async fn limiter_spaces_consecutive_reservations() {
        let mut lim = IntervalLimiter::new(Duration::from_millis(500));
        assert!(lim.reserve().is_zero());
        let wait = lim.reserve();
        assert!(wait > Duration::from_millis(400), "wait was {wait:?}");
        assert!(wait <= Duration::from_millis(500));
    }

    fn throttled(per_chat_ms: u64) -> (ThrottledMessenger, Arc<RecordingMessenger>) {
        let inner = Arc::new(RecordingMessenger::new());
        let messenger = ThrottledMessenger::new(
            inner.clone(),
            ThrottleConfig {
                global_min_interval: Duration::ZERO,
                per_chat_min_interval: Duration::from_millis(per_chat_ms),
            },
        );
        (messenger, inner)
    }

    #[tokio::test]
    async fn same_chat_calls_are_spaced() {
        let (m, inner) = throttled(60);
        let started = Instant::now();
        m.send_text(ChatId(1), "a", None).await.unwrap();
        m.send_text(ChatId(1), "b", None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(inner.sent().len(), 2);
    }

    #[tokio::test]
    async fn different_chats_do_not_wait_on_each_other() {
        let (m, inner) = throttled(5_000);
        let started = Instant::now();
        m.send_text(ChatId(1), "a", None).await.unwrap();
        m.send_text(ChatId(2), "b", None).await.unwrap();
        m.answer_callback_query("q", None).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(1_000));
        assert_eq!(inner.acks(), 1);
        assert_eq!(inner.sent().len(), 3);
    }

    #[tokio::test]
    async fn idle_chats_are_forgotten() {
        let (m, _inner) = throttled(0);
        for chat in 0..50 {
            m.send_text(ChatId(chat), "x", None).await.unwrap();
        }
        assert!(m.per_chat.lock().await.len() <= 2);
    }

    #[tokio::test]
    async fn zero_interval_never_waits() {
        let mut lim = IntervalLimiter::new(Duration::ZERO);
        for _ in 0..5 {
            assert!(lim.reserve().is_zero());
        }
    }
}
