/// Command Handler
///
/// Maps chat commands onto tracker operations and sends the replies.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::tracker::CallTracker;
use crate::util::display::{format_goodbye, format_performance, format_welcome, ANALYZING_NOTICE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Stats,
    Performance,
}

impl Command {
    /// Parse the first word of a message. Accepts `/cmd@botname` and ignores
    /// trailing arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "stop" => Some(Command::Stop),
            "stats" => Some(Command::Stats),
            "performance" => Some(Command::Performance),
            _ => None,
        }
    }
}

pub struct CommandHandler {
    tracker: Arc<CallTracker>,
    welcome: String,
}

impl CommandHandler {
    pub fn new(tracker: Arc<CallTracker>, config: &Config) -> Self {
        Self {
            tracker,
            welcome: format_welcome(config),
        }
    }

    /// Handle one incoming text message. Returns the command that was run, if any.
    pub async fn handle(&self, chat_id: i64, text: &str) -> Option<Command> {
        let Some(command) = Command::parse(text) else {
            debug!(chat_id, "Ignoring non-command message");
            return None;
        };
        info!(chat_id, ?command, "📨 Command received");

        match command {
            Command::Start => {
                self.tracker.on_subscribe(chat_id);
                self.reply(chat_id, &self.welcome).await;
            }
            Command::Stop => {
                self.tracker.on_unsubscribe(chat_id);
                self.reply(chat_id, &format_goodbye()).await;
            }
            Command::Stats => {
                self.reply(chat_id, ANALYZING_NOTICE).await;
                let outcome = self.tracker.on_stats_request().await;
                self.reply(chat_id, &format_performance(&outcome)).await;
            }
            Command::Performance => {
                self.reply(chat_id, ANALYZING_NOTICE).await;
                let outcome = self.tracker.on_performance_request().await;
                self.reply(chat_id, &format_performance(&outcome)).await;
                info!(chat_id, "📊 Performance report sent");
            }
        }

        Some(command)
    }

    async fn reply(&self, chat_id: i64, message: &str) {
        if let Err(e) = self.tracker.bus().reply(chat_id, message).await {
            warn!(chat_id, error = %e, "Failed to send reply");
        }
    }
}
