use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::UserId as TgUserId};

use rcb_core::{
    config::Config,
    dispatcher::MessageDispatcher,
    messaging::port::MessagingPort,
    ports::{AttachmentFetcher, PrinterSink},
};

use crate::fetch::TelegramFileFetcher;
use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<MessageDispatcher>,
    /// Our own account; messages from it are never printed.
    pub bot_id: Option<TgUserId>,
}

/// Poll Telegram and feed every message through the pipeline.
///
/// `http` downloads resolved Telegram file links.
pub async fn run_polling(
    cfg: Arc<Config>,
    http: Arc<dyn AttachmentFetcher>,
    printer: Arc<dyn PrinterSink>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let bot_id = match bot.get_me().await {
        Ok(me) => {
            tracing::info!("rcb started: @{}", me.username());
            Some(me.id)
        }
        Err(e) => {
            tracing::warn!("getMe failed: {e}");
            None
        }
    };
    tracing::info!(
        normal = cfg.normal_channels.len(),
        inverted = cfg.inverted_channels.len(),
        "channels configured"
    );
    tracing::info!(
        start = %cfg.active_window.start(),
        end = %cfg.active_window.end(),
        "active window"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone())?);
    let fetcher: Arc<dyn AttachmentFetcher> = Arc::new(TelegramFileFetcher::new(bot.clone(), http));
    let dispatcher = Arc::new(MessageDispatcher::new(&cfg, fetcher, printer, messenger)?);

    let state = Arc::new(AppState { dispatcher, bot_id });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
