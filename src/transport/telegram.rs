/// Telegram transport
///
/// Outbound delivery through the Bot API plus a long-polling command loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, LinkPreviewOptions, ParseMode, UpdateKind};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::core::errors::TrackerError;
use crate::handlers::command_handler::CommandHandler;
use crate::transport::alert_bus::Notifier;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, chat_id: i64, message: &str) -> Result<(), TrackerError> {
        self.bot
            .send_message(ChatId(chat_id), message)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_link_preview())
            .await
            .map_err(|e| TrackerError::Delivery(format!("chat {}: {}", chat_id, e)))?;
        Ok(())
    }
}

/// Long-polls `getUpdates` and routes text messages to the command handler.
pub struct TelegramCommandPoller {
    bot: Bot,
    handler: Arc<CommandHandler>,
    poll_timeout_secs: u32,
}

impl TelegramCommandPoller {
    pub fn new(bot: Bot, handler: Arc<CommandHandler>, poll_timeout_secs: u32) -> Self {
        Self { bot, handler, poll_timeout_secs }
    }

    #[instrument(skip(self, shutdown))]
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!("📨 Telegram command poller starting");
        let mut offset: i32 = 0;

        loop {
            let mut request = self.bot.get_updates().timeout(self.poll_timeout_secs);
            if offset > 0 {
                request = request.offset(offset);
            }

            let updates = tokio::select! {
                result = request.send() => result,
                _ = shutdown.recv() => break,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "Telegram poll failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(POLL_RETRY_DELAY) => continue,
                        _ = shutdown.recv() => break,
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.id.0 as i32 + 1);

                let UpdateKind::Message(message) = update.kind else {
                    continue;
                };
                let Some(text) = message.text() else {
                    continue;
                };

                debug!(chat_id = message.chat.id.0, "Incoming message");
                let handler = Arc::clone(&self.handler);
                let chat_id = message.chat.id.0;
                let text = text.to_string();
                // Reports can take a while; keep polling while they run
                tokio::spawn(async move {
                    handler.handle(chat_id, &text).await;
                });
            }
        }

        info!("🛑 Telegram command poller shutting down gracefully");
        Ok(())
    }
}
