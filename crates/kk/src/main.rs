use std::sync::Arc;

use anyhow::Context;
use teloxide::Bot;
use tracing::info;

use kk_core::{
    config::Config,
    dispatcher::{Dispatcher, DispatcherOptions},
    handlers::{CategoryHandler, ClearHandler, FeedHandler, HandlerRegistry, SavedHandler, Services},
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    ports::CategoryCatalog,
};
use kk_imageapi::ImageApiClient;
use kk_sqlite::SqliteStore;
use kk_telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kk_core::logging::init("kk")?;

    let cfg = Config::load().context("failed to load configuration")?;
    let catalog = Arc::new(CategoryCatalog::new(cfg.api_categories.clone())?);
    info!(
        categories = catalog.len(),
        default = catalog.default_name(),
        database = %cfg.database_path.display(),
        "starting"
    );

    let store = Arc::new(SqliteStore::open(&cfg.database_path, catalog.clone())?);
    let images = Arc::new(ImageApiClient::new(&cfg.api_base_url, cfg.http_timeout)?);
    let services = Services {
        categories: store.clone(),
        saved: store,
        images,
        timeout: cfg.operation_timeout,
    };

    let registry = HandlerRegistry::builder()
        .register(Arc::new(FeedHandler::new(services.clone())))
        .register(Arc::new(CategoryHandler::new(
            services.clone(),
            catalog,
            cfg.category_page_size,
        )))
        .register(Arc::new(SavedHandler::new(services.clone())))
        .register(Arc::new(ClearHandler::new(services)))
        .build()?;

    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Throttle in front of the adapter's own 429 retry.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig {
            global_min_interval: cfg.throttle_global,
            per_chat_min_interval: cfg.throttle_per_chat,
        },
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        messenger,
        DispatcherOptions {
            reply_unsupported: cfg.reply_unsupported,
        },
    ));

    kk_telegram::router::run_polling(bot, dispatcher)
        .await
        .context("telegram bot failed")
}
