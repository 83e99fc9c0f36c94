/// Call tracker service
///
/// Owns the alert ledger and call history for the lifetime of the process and
/// is the only place either is mutated. Scan cycles run single-flight; a tick
/// that arrives while a cycle is still running is dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::analytics::performance_tracker::{PerformanceAnalyzer, PerformanceOutcome, PriceLookup};
use crate::config::Config;
use crate::core::ledger::{AlertLedger, CallHistory};
use crate::core::types::{CallRecord, Signal};
use crate::scout::{Selection, SignalSelector, TokenScanner};
use crate::transport::alert_bus::{AlertBus, DeliveryReport};
use crate::util::dexscreener::TokenPair;
use crate::util::display::format_signal_alert;
use crate::util::market_data::MarketData;

#[derive(Debug)]
pub struct TrackerState {
    pub ledger: AlertLedger,
    pub history: CallHistory,
}

impl TrackerState {
    pub fn new(config: &Config) -> Self {
        Self {
            ledger: AlertLedger::new(config.history.alert_ledger_capacity),
            history: CallHistory::new(config.history.call_history_capacity),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CycleInProgress,
    NoSubscribers,
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Skipped(SkipReason),
    NoSignal { checked: usize, qualified: usize },
    Emitted { signal: Signal, delivery: DeliveryReport },
}

impl ScanOutcome {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            ScanOutcome::Emitted { signal, .. } => Some(signal),
            _ => None,
        }
    }
}

pub struct CallTracker {
    selector: SignalSelector,
    scanner: TokenScanner,
    analyzer: PerformanceAnalyzer,
    market: Arc<dyn MarketData>,
    bus: AlertBus,
    state: Mutex<TrackerState>,
    scan_guard: Mutex<()>,
}

impl CallTracker {
    pub fn new(config: &Config, market: Arc<dyn MarketData>, bus: AlertBus) -> Self {
        info!(
            ledger_capacity = config.history.alert_ledger_capacity,
            history_capacity = config.history.call_history_capacity,
            "🧭 Initializing call tracker"
        );
        Self {
            selector: SignalSelector::from_config(config),
            scanner: TokenScanner::new(config),
            analyzer: PerformanceAnalyzer::new(config),
            market,
            bus,
            state: Mutex::new(TrackerState::new(config)),
            scan_guard: Mutex::new(()),
        }
    }

    pub fn bus(&self) -> &AlertBus {
        &self.bus
    }

    /// One full scan: gather candidates, promote the best, deliver it.
    #[instrument(skip(self))]
    pub async fn run_scan_cycle(&self) -> ScanOutcome {
        let Ok(_cycle) = self.scan_guard.try_lock() else {
            warn!("⏳ Previous scan cycle still running, skipping tick");
            return ScanOutcome::Skipped(SkipReason::CycleInProgress);
        };

        if !self.bus.has_subscribers() {
            debug!("No subscribers, skipping scan");
            return ScanOutcome::Skipped(SkipReason::NoSubscribers);
        }

        info!("🔍 Starting scan cycle");
        let batch = self.scanner.collect(self.market.as_ref()).await;
        if batch.terms_failed > 0 {
            warn!(failed = batch.terms_failed, searched = batch.terms_searched, "Some search terms failed this cycle");
        }

        let now = Utc::now();
        let selection = self.promote_best(&batch.candidates, now).await;
        info!(checked = selection.checked, qualified = selection.qualified, "📊 Scan complete");

        let Some(signal) = selection.best else {
            info!("⏭️ No valid signals found this cycle");
            return ScanOutcome::NoSignal { checked: selection.checked, qualified: selection.qualified };
        };

        let message = format_signal_alert(&signal, now);
        let delivery = self.bus.publish(&message).await;
        info!(
            tier = %signal.tier,
            symbol = %signal.pair.symbol(),
            volume = signal.volume_estimate,
            delivered = delivery.delivered,
            failed = delivery.failed,
            "✅ Alert sent"
        );

        ScanOutcome::Emitted { signal, delivery }
    }

    /// Select the best candidate and record it, all under one lock so the
    /// ledger check and the ledger insert cannot interleave with another writer.
    pub async fn promote_best(&self, candidates: &[TokenPair], now: DateTime<Utc>) -> Selection {
        let mut state = self.state.lock().await;
        let selection = self.selector.select(candidates, &state.ledger, now);
        debug!(rejections = ?selection.rejections, "Selection finished");

        let Some(signal) = selection.best.as_ref() else {
            return selection;
        };

        if let Some(evicted) = state.ledger.insert(signal.pair_address()) {
            debug!(pair = %evicted, capacity = state.ledger.capacity(), "Alert ledger full, evicted oldest pair");
        }
        if let Some(evicted) = state.history.push(CallRecord::from_signal(signal, now)) {
            debug!(symbol = %evicted.symbol, capacity = state.history.capacity(), "Call history full, evicted oldest call");
        }

        selection
    }

    /// Re-price a history snapshot. Holds no lock while fetching.
    pub async fn compute_performance_report(&self, calls: &[CallRecord], lookup: PriceLookup) -> PerformanceOutcome {
        self.analyzer.analyze(calls, lookup, self.market.as_ref(), Utc::now()).await
    }

    pub fn on_subscribe(&self, chat_id: i64) -> bool {
        self.bus.subscribe(chat_id)
    }

    pub fn on_unsubscribe(&self, chat_id: i64) -> bool {
        self.bus.unsubscribe(chat_id)
    }

    /// Compact report, priced by pair address.
    pub async fn on_stats_request(&self) -> PerformanceOutcome {
        let calls = self.history_snapshot().await;
        self.compute_performance_report(&calls, PriceLookup::ByPair).await
    }

    /// Full report, priced by token address.
    pub async fn on_performance_request(&self) -> PerformanceOutcome {
        let calls = self.history_snapshot().await;
        self.compute_performance_report(&calls, PriceLookup::ByToken).await
    }

    pub async fn history_snapshot(&self) -> Vec<CallRecord> {
        self.state.lock().await.history.snapshot()
    }

    pub async fn is_alerted(&self, pair_address: &str) -> bool {
        self.state.lock().await.ledger.contains(pair_address)
    }

    /// `(ledger entries, history entries)`
    pub async fn state_sizes(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.ledger.len(), state.history.len())
    }

    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.ledger.clear();
        state.history.clear();
        info!("🔄 Tracker state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::TrackerError;
    use crate::transport::alert_bus::Notifier;
    use crate::util::dexscreener::fixtures::PairBuilder;
    use async_trait::async_trait;

    struct NoMarket;

    #[async_trait]
    impl MarketData for NoMarket {
        async fn search(&self, _term: &str) -> Result<Vec<TokenPair>, TrackerError> {
            Ok(vec![])
        }
        async fn pair_by_address(&self, _c: &str, _p: &str) -> Result<Option<TokenPair>, TrackerError> {
            Ok(None)
        }
        async fn pairs_by_token(&self, _t: &str) -> Result<Vec<TokenPair>, TrackerError> {
            Ok(vec![])
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn deliver(&self, _chat_id: i64, _message: &str) -> Result<(), TrackerError> {
            Ok(())
        }
    }

    fn tracker(config: &Config) -> CallTracker {
        CallTracker::new(config, Arc::new(NoMarket), AlertBus::new(Arc::new(SilentNotifier)))
    }

    fn strong(address: &str) -> TokenPair {
        PairBuilder::new(address).buys(100, 400).volume_5m(24_000.0).price("0.0042").build()
    }

    #[tokio::test]
    async fn test_promotion_records_call_at_current_price() {
        let tracker = tracker(&Config::default());
        let now = Utc::now();

        let selection = tracker.promote_best(&[strong("abc")], now).await;
        assert_eq!(selection.best.unwrap().pair_address(), "abc");

        let history = tracker.history_snapshot().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].pair_address, "abc");
        assert_eq!(history[0].initial_price, 0.0042);
        assert_eq!(history[0].called_at, now);
        assert!(tracker.is_alerted("abc").await);
    }

    #[tokio::test]
    async fn test_promoted_pair_not_emitted_twice() {
        let tracker = tracker(&Config::default());
        let now = Utc::now();

        let first = tracker.promote_best(&[strong("abc")], now).await;
        assert!(first.best.is_some());
        let second = tracker.promote_best(&[strong("abc")], now).await;
        assert!(second.best.is_none());
        assert_eq!((second.checked, second.qualified), (1, 0));
        assert_eq!(second.rejections.already_alerted, 1);
        assert_eq!(tracker.state_sizes().await, (1, 1));
    }

    #[tokio::test]
    async fn test_capacities_hold_across_promotions() {
        let mut config = Config::default();
        config.history.alert_ledger_capacity = 5;
        config.history.call_history_capacity = 3;
        let tracker = tracker(&config);

        for i in 0..8 {
            tracker.promote_best(&[strong(&format!("pair-{}", i))], Utc::now()).await;
        }

        assert_eq!(tracker.state_sizes().await, (5, 3));
        assert!(!tracker.is_alerted("pair-2").await);
        assert!(tracker.is_alerted("pair-3").await);
        let symbols: Vec<String> = tracker.history_snapshot().await.into_iter().map(|c| c.pair_address).collect();
        assert_eq!(symbols, vec!["pair-5", "pair-6", "pair-7"]);
    }

    #[tokio::test]
    async fn test_scan_skipped_without_subscribers() {
        let tracker = tracker(&Config::default());
        let outcome = tracker.run_scan_cycle().await;
        assert!(matches!(outcome, ScanOutcome::Skipped(SkipReason::NoSubscribers)));
    }

    /// Holds every search open until released, so a cycle can be caught mid-flight.
    struct GatedMarket {
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl MarketData for GatedMarket {
        async fn search(&self, _term: &str) -> Result<Vec<TokenPair>, TrackerError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(vec![strong("gated")])
        }
        async fn pair_by_address(&self, _c: &str, _p: &str) -> Result<Option<TokenPair>, TrackerError> {
            Ok(None)
        }
        async fn pairs_by_token(&self, _t: &str) -> Result<Vec<TokenPair>, TrackerError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_dropped() {
        let mut config = Config::default();
        config.scanner.search_terms = vec!["pump".to_string()];
        config.dexscreener.scan_pacing_ms = 0;
        let market = Arc::new(GatedMarket { started: tokio::sync::Notify::new(), release: tokio::sync::Notify::new() });
        let tracker = Arc::new(CallTracker::new(&config, market.clone(), AlertBus::new(Arc::new(SilentNotifier))));
        tracker.on_subscribe(1);

        let first = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.run_scan_cycle().await }
        });
        market.started.notified().await;

        let second = tracker.run_scan_cycle().await;
        assert!(matches!(second, ScanOutcome::Skipped(SkipReason::CycleInProgress)));

        market.release.notify_one();
        let first = first.await.unwrap();
        assert_eq!(first.signal().map(|s| s.pair_address().to_string()), Some("gated".to_string()));
        assert_eq!(tracker.state_sizes().await, (1, 1));
    }

    #[tokio::test]
    async fn test_empty_history_reports_no_calls() {
        let tracker = tracker(&Config::default());
        assert_eq!(tracker.on_performance_request().await, PerformanceOutcome::NoCalls);
        assert_eq!(tracker.on_stats_request().await, PerformanceOutcome::NoCalls);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let tracker = tracker(&Config::default());
        tracker.promote_best(&[strong("abc")], Utc::now()).await;
        tracker.reset().await;
        assert_eq!(tracker.state_sizes().await, (0, 0));
    }
}
