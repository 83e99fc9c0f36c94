use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::core::ledger::AlertLedger;
use crate::core::types::Signal;
use crate::scout::filter::SafetyFilter;
use crate::scout::metrics::MetricsCalculator;
use crate::scout::tiers::TierClassifier;
use crate::util::dexscreener::TokenPair;
use crate::util::market_data::MarketData;
use crate::util::pacing::{with_timeout, Pacer};

/// Why a candidate did not become a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyAlerted,
    NoMetrics,
    NoTier,
    LowLiquidity,
    TooOld,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    pub already_alerted: usize,
    pub no_metrics: usize,
    pub no_tier: usize,
    pub low_liquidity: usize,
    pub too_old: usize,
}

impl RejectionCounts {
    fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::AlreadyAlerted => self.already_alerted += 1,
            Rejection::NoMetrics => self.no_metrics += 1,
            Rejection::NoTier => self.no_tier += 1,
            Rejection::LowLiquidity => self.low_liquidity += 1,
            Rejection::TooOld => self.too_old += 1,
        }
    }
}

/// Outcome of ranking one batch of candidates.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub best: Option<Signal>,
    pub checked: usize,
    pub qualified: usize,
    pub rejections: RejectionCounts,
}

/// Candidate pairs gathered for one scan cycle.
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    pub candidates: Vec<TokenPair>,
    pub terms_searched: usize,
    pub terms_failed: usize,
}

/// Runs the metrics, tier and safety stages over a batch and keeps the single
/// strongest qualifying candidate.
#[derive(Debug, Clone, Default)]
pub struct SignalSelector {
    metrics: MetricsCalculator,
    classifier: TierClassifier,
    safety: SafetyFilter,
}

impl SignalSelector {
    pub fn new(metrics: MetricsCalculator, classifier: TierClassifier, safety: SafetyFilter) -> Self {
        Self { metrics, classifier, safety }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            MetricsCalculator::new(config.metrics.clone()),
            TierClassifier::new(config.tiers.clone()),
            SafetyFilter::new(config.safety.clone()),
        )
    }

    /// Run every gate for a single candidate, cheapest first.
    pub fn evaluate(&self, pair: &TokenPair, ledger: &AlertLedger, now: DateTime<Utc>) -> Result<Signal, Rejection> {
        let symbol = pair.symbol();

        if ledger.contains(&pair.pair_address) {
            debug!(symbol = %symbol, "⏭️ Skipping - already alerted");
            return Err(Rejection::AlreadyAlerted);
        }

        let metrics = self.metrics.calculate(pair).ok_or(Rejection::NoMetrics)?;
        debug!(
            symbol = %symbol,
            recent_buys = metrics.recent_buys,
            volume = metrics.volume_estimate,
            avg_buy = metrics.avg_buy_size,
            "📈 Metrics"
        );

        let tier = self.classifier.classify(&metrics).ok_or(Rejection::NoTier)?;

        let safety = self.safety.check(pair, now);
        if !safety.liquidity_ok {
            debug!(symbol = %symbol, tier = %tier, liquidity = pair.liquidity_usd(), "❌ Skipping - low liquidity");
            return Err(Rejection::LowLiquidity);
        }
        if !safety.age_ok {
            debug!(symbol = %symbol, tier = %tier, age_hours = ?self.safety.age_hours(pair, now), "❌ Skipping - too old or unknown age");
            return Err(Rejection::TooOld);
        }

        debug!(symbol = %symbol, tier = %tier, "✅ Candidate qualifies");
        Ok(Signal::new(pair.clone(), tier, metrics, safety))
    }

    /// Pick the best signal of a batch: highest tier, then largest volume
    /// estimate. Exact ties keep arrival order.
    pub fn select(&self, candidates: &[TokenPair], ledger: &AlertLedger, now: DateTime<Utc>) -> Selection {
        let mut selection = Selection::default();
        let mut signals: Vec<Signal> = Vec::new();

        for pair in candidates {
            selection.checked += 1;
            match self.evaluate(pair, ledger, now) {
                Ok(signal) => signals.push(signal),
                Err(rejection) => selection.rejections.record(rejection),
            }
        }

        selection.qualified = signals.len();
        signals.sort_by(|a, b| {
            b.priority_rank
                .cmp(&a.priority_rank)
                .then_with(|| b.volume_estimate.total_cmp(&a.volume_estimate))
        });
        selection.best = signals.into_iter().next();
        selection
    }
}

/// Fans the configured search terms out to the market-data collaborator and
/// gathers the candidate batch for one cycle.
#[derive(Debug)]
pub struct TokenScanner {
    chain_id: String,
    search_terms: Vec<String>,
    pairs_per_term: usize,
    call_timeout: Duration,
    pacer: Pacer,
}

impl TokenScanner {
    pub fn new(config: &Config) -> Self {
        Self {
            chain_id: config.scanner.chain_id.clone(),
            search_terms: config.scanner.search_terms.clone(),
            pairs_per_term: config.scanner.pairs_per_term,
            call_timeout: Duration::from_secs(config.dexscreener.request_timeout_secs.max(1)),
            pacer: Pacer::new("scan", Duration::from_millis(config.dexscreener.scan_pacing_ms)),
        }
    }

    /// A failed search only loses that term's candidates.
    #[instrument(skip(self, market))]
    pub async fn collect(&self, market: &dyn MarketData) -> ScanBatch {
        let mut batch = ScanBatch::default();
        let mut seen: HashSet<String> = HashSet::new();

        for term in &self.search_terms {
            self.pacer.wait_turn().await;
            batch.terms_searched += 1;

            let result = with_timeout(self.call_timeout, market.search(term)).await;
            self.pacer.record(&result).await;

            let pairs = match result {
                Ok(pairs) => pairs,
                Err(e) => {
                    warn!(term = %term, error = %e, transient = e.is_transient(), "❌ Error scanning search term");
                    batch.terms_failed += 1;
                    continue;
                }
            };

            let on_chain: Vec<TokenPair> = pairs
                .into_iter()
                .filter(|pair| pair.chain_id == self.chain_id)
                .collect();
            info!(term = %term, chain = %self.chain_id, pairs = on_chain.len(), "📊 Found pairs for search term");

            for pair in on_chain.into_iter().take(self.pairs_per_term) {
                if seen.insert(pair.pair_address.clone()) {
                    batch.candidates.push(pair);
                }
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::TrackerError;
    use crate::core::types::Tier;
    use crate::util::dexscreener::fixtures::PairBuilder;
    use async_trait::async_trait;

    fn medium(address: &str, volume_5m: f64) -> TokenPair {
        // 35 recent buys: enough for Medium, short of Strong
        PairBuilder::new(address).buys(70, 300).volume_5m(volume_5m).build()
    }

    #[test]
    fn test_volume_breaks_ties_within_tier() {
        let selector = SignalSelector::default();
        let ledger = AlertLedger::new(100);
        let candidates = vec![medium("six", 6000.0 * 2.0), medium("nine", 9000.0 / 0.5)];

        let selection = selector.select(&candidates, &ledger, Utc::now());
        let best = selection.best.unwrap();
        assert_eq!(best.tier, Tier::Medium);
        assert_eq!(best.pair_address(), "nine");
        assert_eq!(best.volume_estimate, 9000.0);
        assert_eq!(selection.qualified, 2);
    }

    #[test]
    fn test_higher_tier_beats_larger_volume() {
        let selector = SignalSelector::default();
        let ledger = AlertLedger::new(100);
        let first_call = PairBuilder::new("small").buys(44, 100).volume_5m(7000.0).build();
        let strong = PairBuilder::new("strong").buys(100, 400).volume_5m(24_000.0).build();
        let medium_big = medium("medium", 13_000.0);

        let selection = selector.select(&[first_call, medium_big, strong], &ledger, Utc::now());
        let best = selection.best.unwrap();
        assert_eq!(best.pair_address(), "strong");
        assert_eq!(best.tier, Tier::Strong);
        assert_eq!(best.priority_rank, 3);
    }

    #[test]
    fn test_exact_tie_keeps_arrival_order() {
        let selector = SignalSelector::default();
        let ledger = AlertLedger::new(100);

        let selection = selector.select(&[medium("first", 14_000.0), medium("second", 14_000.0)], &ledger, Utc::now());
        assert_eq!(selection.best.unwrap().pair_address(), "first");
    }

    #[test]
    fn test_alerted_pair_never_reselected() {
        let selector = SignalSelector::default();
        let mut ledger = AlertLedger::new(100);
        ledger.insert("whale");

        let whale = PairBuilder::new("whale").buys(400, 2000).volume_5m(200_000.0).build();
        let modest = medium("modest", 12_000.0);

        let selection = selector.select(&[whale.clone(), modest], &ledger, Utc::now());
        assert_eq!(selection.best.unwrap().pair_address(), "modest");
        assert_eq!(selection.rejections.already_alerted, 1);

        let selection = selector.select(&[whale], &ledger, Utc::now());
        assert!(selection.best.is_none());
    }

    #[test]
    fn test_safety_failures_disqualify() {
        let selector = SignalSelector::default();
        let ledger = AlertLedger::new(100);
        let now = Utc::now();

        let illiquid = PairBuilder::new("illiquid").buys(200, 900).volume_5m(50_000.0).liquidity(Some(1000.0)).build();
        let ancient = PairBuilder::new("ancient")
            .buys(200, 900)
            .volume_5m(50_000.0)
            .created_at_millis(Some((now - chrono::Duration::days(30)).timestamp_millis()))
            .build();
        let undated = PairBuilder::new("undated").buys(200, 900).volume_5m(50_000.0).created_at_millis(None).build();

        let selection = selector.select(&[illiquid, ancient, undated], &ledger, now);
        assert!(selection.best.is_none());
        assert_eq!(selection.rejections.low_liquidity, 1);
        assert_eq!(selection.rejections.too_old, 2);
    }

    #[test]
    fn test_empty_batch_selects_nothing() {
        let selector = SignalSelector::default();
        let selection = selector.select(&[], &AlertLedger::new(10), Utc::now());
        assert!(selection.best.is_none());
        assert_eq!(selection.checked, 0);
    }

    #[test]
    fn test_rejection_reasons_counted() {
        let selector = SignalSelector::default();
        let ledger = AlertLedger::new(10);
        let quiet = PairBuilder::new("quiet").buys(10, 2).volume_5m(1000.0).build();
        let weak = PairBuilder::new("weak").buys(10, 50).volume_5m(1000.0).build();

        let selection = selector.select(&[quiet, weak], &ledger, Utc::now());
        assert_eq!(selection.rejections.no_metrics, 1);
        assert_eq!(selection.rejections.no_tier, 1);
        assert_eq!(selection.checked, 2);
    }

    /// Canned search results keyed by term.
    struct TermMarket;

    #[async_trait]
    impl MarketData for TermMarket {
        async fn search(&self, term: &str) -> Result<Vec<TokenPair>, TrackerError> {
            match term {
                "first" => Ok(vec![PairBuilder::new("dup").build()]),
                "broken" => Err(TrackerError::TransientFetch("connection reset".into())),
                "evm" => Ok((0..3).map(|i| PairBuilder::new(&format!("eth-{}", i)).chain("ethereum").build()).collect()),
                "many" => {
                    let mut pairs = vec![PairBuilder::new("m0").build(), PairBuilder::new("dup").build()];
                    pairs.push(PairBuilder::new("eth-x").chain("ethereum").build());
                    pairs.extend((1..24).map(|i| PairBuilder::new(&format!("m{}", i)).build()));
                    Ok(pairs)
                }
                _ => Ok(vec![]),
            }
        }
        async fn pair_by_address(&self, _c: &str, _p: &str) -> Result<Option<TokenPair>, TrackerError> {
            Ok(None)
        }
        async fn pairs_by_token(&self, _t: &str) -> Result<Vec<TokenPair>, TrackerError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_collect_isolates_failures_filters_chain_caps_and_dedupes() {
        let mut config = Config::default();
        config.scanner.search_terms = ["first", "broken", "evm", "many"].iter().map(|t| t.to_string()).collect();
        config.scanner.pairs_per_term = 20;
        config.dexscreener.scan_pacing_ms = 0;
        let scanner = TokenScanner::new(&config);

        let batch = scanner.collect(&TermMarket).await;
        assert_eq!(batch.terms_searched, 4);
        assert_eq!(batch.terms_failed, 1);

        // "many" keeps its first 20 solana pairs (m0, dup, m1..m18); dup was already seen
        let mut expected = vec!["dup".to_string(), "m0".to_string()];
        expected.extend((1..19).map(|i| format!("m{}", i)));
        let addresses: Vec<String> = batch.candidates.iter().map(|p| p.pair_address.clone()).collect();
        assert_eq!(addresses, expected);
        assert!(batch.candidates.iter().all(|p| p.chain_id == "solana"));
    }
}
