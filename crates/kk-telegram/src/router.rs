use std::sync::Arc;

use teloxide::{dispatching::Dispatcher as TgDispatcher, dptree, prelude::*};
use tracing::{info, warn};

use kk_core::dispatcher::Dispatcher;

use crate::handlers;

/// Long-poll Telegram until the process is stopped.
///
/// Publishes the command menu first; a failure there is logged, not fatal.
pub async fn run_polling(bot: Bot, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "bot started"),
        Err(e) => warn!(error = %e, "get_me failed"),
    }

    if let Err(e) = dispatcher.publish_commands().await {
        warn!(error = %e, "failed to publish command menu");
    }

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    TgDispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
