use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use teloxide::Bot;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smart_money_tracker::config::{Config, Logging};
use smart_money_tracker::core::tracker::CallTracker;
use smart_money_tracker::handlers::{CommandHandler, ScanScheduler};
use smart_money_tracker::transport::{AlertBus, TelegramCommandPoller, TelegramNotifier};
use smart_money_tracker::util::dexscreener::DexScreenerClient;

const CONFIG_PATH_ENV: &str = "SMART_MONEY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

struct ServiceOrchestrator {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl ServiceOrchestrator {
    fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    #[instrument(skip(self, config))]
    fn start_all_services(&mut self, config: &Config) -> Result<()> {
        info!("🚀 Starting tracker services");

        let token = config.bot_token()?;
        let bot = Bot::new(token);

        let market = Arc::new(DexScreenerClient::new(&config.dexscreener)?);
        let notifier = Arc::new(TelegramNotifier::new(bot.clone()));
        let bus = AlertBus::new(notifier);
        let tracker = Arc::new(CallTracker::new(config, market, bus));

        // Scan scheduler
        let scheduler = ScanScheduler::new(Arc::clone(&tracker), config);
        let scan_shutdown = self.shutdown_tx.subscribe();
        let scan_task = tokio::spawn(async move {
            info!("🔍 Scan scheduler service starting");
            let result = scheduler.run(scan_shutdown).await;
            if let Err(e) = &result {
                error!("Scan scheduler error: {}", e);
            }
            result
        });
        self.tasks.push(("scan scheduler", scan_task));

        // Command poller
        let handler = Arc::new(CommandHandler::new(Arc::clone(&tracker), config));
        let poller = TelegramCommandPoller::new(bot, handler, config.telegram.poll_timeout_secs);
        let poll_shutdown = self.shutdown_tx.subscribe();
        let poll_task = tokio::spawn(async move {
            info!("📨 Command poller service starting");
            let result = poller.run(poll_shutdown).await;
            if let Err(e) = &result {
                error!("Command poller error: {}", e);
            }
            result
        });
        self.tasks.push(("command poller", poll_task));

        info!("✅ All {} services started successfully", self.tasks.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn shutdown_all(&mut self) -> Result<()> {
        info!("🛑 Shutting down all services");

        let _ = self.shutdown_tx.send(());
        debug!("Shutdown signal sent to all services");

        for (name, task) in self.tasks.drain(..) {
            match task.await {
                Ok(Ok(())) => info!("✅ Service {} shut down cleanly", name),
                Ok(Err(e)) => warn!("⚠️  Service {} error during shutdown: {}", name, e),
                Err(e) => error!("❌ Service {} task failed: {}", name, e),
            }
        }

        info!("✅ All services shut down successfully");
        Ok(())
    }
}

fn init_tracing(logging: &Logging) -> Result<()> {
    std::fs::create_dir_all(&logging.directory)?;

    let file_appender = tracing_appender::rolling::daily(&logging.directory, &logging.file_prefix);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.default_filter)),
        )
        .init();

    // The writer must outlive main
    std::mem::forget(guard);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let loaded = Config::load(&config_path);
    let logging = loaded.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    init_tracing(&logging)?;

    info!("💎 Smart Money Tracker");
    info!("======================");

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_path.display(), "Configuration error: {}", e);
            return Err(e.into());
        }
    };
    info!(
        chain = %config.scanner.chain_id,
        interval_secs = config.scanner.interval_secs,
        terms = ?config.scanner.search_terms,
        "⚙️ Configuration loaded"
    );

    let mut orchestrator = ServiceOrchestrator::new();

    match orchestrator.start_all_services(&config) {
        Ok(()) => {
            info!("🎯 Tracker is now scanning for smart money activity");
            info!("Press Ctrl+C to shutdown all services");
        }
        Err(e) => {
            error!("Failed to start services: {}", e);
            return Err(e);
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    orchestrator.shutdown_all().await?;

    info!("👋 Smart Money Tracker shutdown complete");
    Ok(())
}
