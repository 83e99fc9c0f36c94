/// Scan Handler
///
/// Drives the tracker's scan cycle on a fixed interval until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::core::tracker::{CallTracker, ScanOutcome};

pub struct ScanScheduler {
    tracker: Arc<CallTracker>,
    first_delay: Duration,
    period: Duration,
}

impl ScanScheduler {
    pub fn new(tracker: Arc<CallTracker>, config: &Config) -> Self {
        Self {
            tracker,
            first_delay: Duration::from_secs(config.scanner.first_scan_delay_secs),
            period: Duration::from_secs(config.scanner.interval_secs.max(1)),
        }
    }

    /// Run until a shutdown message arrives. A cycle in flight when shutdown
    /// fires is dropped at its next await point.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            first_delay_secs = self.first_delay.as_secs(),
            interval_secs = self.period.as_secs(),
            "🔄 Scan scheduler starting"
        );

        let mut ticker = interval_at(Instant::now() + self.first_delay, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }

            tokio::select! {
                outcome = self.tracker.run_scan_cycle() => {
                    if let ScanOutcome::Emitted { signal, .. } = &outcome {
                        debug!(pair = %signal.pair_address(), "Cycle emitted a signal");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        info!("🛑 Scan scheduler shutting down gracefully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::TrackerError;
    use crate::transport::alert_bus::{AlertBus, Notifier};
    use crate::util::dexscreener::TokenPair;
    use crate::util::market_data::MarketData;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingMarket {
        searches: AtomicUsize,
    }

    #[async_trait]
    impl MarketData for CountingMarket {
        async fn search(&self, _term: &str) -> Result<Vec<TokenPair>, TrackerError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
        async fn pair_by_address(&self, _c: &str, _p: &str) -> Result<Option<TokenPair>, TrackerError> {
            Ok(None)
        }
        async fn pairs_by_token(&self, _t: &str) -> Result<Vec<TokenPair>, TrackerError> {
            Ok(vec![])
        }
    }

    struct NullNotifier;

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn deliver(&self, _chat_id: i64, _message: &str) -> Result<(), TrackerError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_delay_and_stops_on_shutdown() {
        let mut config = Config::default();
        config.scanner.first_scan_delay_secs = 10;
        config.scanner.interval_secs = 15;
        config.scanner.search_terms = vec!["pump".to_string()];
        config.dexscreener.scan_pacing_ms = 0;

        let market = Arc::new(CountingMarket::default());
        let bus = AlertBus::new(Arc::new(NullNotifier));
        bus.subscribe(1);
        let tracker = Arc::new(CallTracker::new(&config, market.clone(), bus));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(ScanScheduler::new(tracker, &config).run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(market.searches.load(Ordering::SeqCst), 0);

        // first tick at 10s, second at 25s
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(market.searches.load(Ordering::SeqCst), 2);

        shutdown_tx.send(()).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
