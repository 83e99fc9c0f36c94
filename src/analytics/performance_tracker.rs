/// Call performance tracker
///
/// Re-prices every recorded call against the market-data collaborator and
/// aggregates the gains. Lookup failures only drop the affected entry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::core::errors::TrackerError;
use crate::core::types::{CallRecord, Tier};
use crate::util::market_data::MarketData;
use crate::util::pacing::{with_timeout, Pacer};

/// Which identifier of a call is used to find its current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceLookup {
    /// Direct pair lookup on the configured chain.
    ByPair,
    /// Token lookup, first pair on the configured chain.
    ByToken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPerformance {
    pub symbol: String,
    pub name: String,
    pub tier: Tier,
    pub initial_price: f64,
    pub current_price: f64,
    pub gain_pct: f64,
    pub called_at: DateTime<Utc>,
    pub hours_since_call: f64,
}

impl CallPerformance {
    pub fn is_profitable(&self) -> bool {
        self.gain_pct > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub count: usize,
    pub profitable: usize,
    pub average_gain_pct: f64,
    pub best_gain_pct: f64,
    pub worst_gain_pct: f64,
}

impl PerformanceSummary {
    pub fn win_rate_pct(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.profitable as f64 / self.count as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub lookup: PriceLookup,
    pub summary: PerformanceSummary,
    /// Best performers first, capped at the configured top-N.
    pub top: Vec<CallPerformance>,
    /// Priced entries beyond the top-N.
    pub remaining: usize,
    /// Entries whose price lookup failed or returned nothing usable.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PerformanceOutcome {
    /// History is empty; nothing to analyze.
    NoCalls,
    /// History has entries but none could be priced.
    PricesUnavailable { attempted: usize },
    Report(PerformanceReport),
}

/// Percentage change from the call price, `None` unless both prices are positive.
pub fn gain_pct(initial_price: f64, current_price: f64) -> Option<f64> {
    if initial_price > 0.0 && current_price > 0.0 && initial_price.is_finite() && current_price.is_finite() {
        Some((current_price - initial_price) / initial_price * 100.0)
    } else {
        None
    }
}

/// Sort priced entries and fold them into a report. Returns `None` for an empty set.
pub fn summarize(
    mut results: Vec<CallPerformance>,
    lookup: PriceLookup,
    top_n: usize,
    skipped: usize,
) -> Option<PerformanceReport> {
    if results.is_empty() {
        return None;
    }

    results.sort_by(|a, b| b.gain_pct.total_cmp(&a.gain_pct));

    let count = results.len();
    let profitable = results.iter().filter(|r| r.is_profitable()).count();
    let average_gain_pct = results.iter().map(|r| r.gain_pct).sum::<f64>() / count as f64;
    let best_gain_pct = results.first().map_or(0.0, |r| r.gain_pct);
    let worst_gain_pct = results.last().map_or(0.0, |r| r.gain_pct);

    let remaining = count.saturating_sub(top_n);
    results.truncate(top_n);

    Some(PerformanceReport {
        lookup,
        summary: PerformanceSummary {
            count,
            profitable,
            average_gain_pct,
            best_gain_pct,
            worst_gain_pct,
        },
        top: results,
        remaining,
        skipped,
    })
}

pub struct PerformanceAnalyzer {
    chain_id: String,
    top_n: usize,
    call_timeout: Duration,
    pacer: Pacer,
}

impl PerformanceAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            chain_id: config.scanner.chain_id.clone(),
            top_n: config.performance.top_n.max(1),
            call_timeout: Duration::from_secs(config.dexscreener.request_timeout_secs.max(1)),
            pacer: Pacer::new("performance", Duration::from_millis(config.dexscreener.performance_pacing_ms)),
        }
    }

    /// Re-price each call and build the report.
    #[instrument(skip(self, calls, market), fields(calls = calls.len()))]
    pub async fn analyze(
        &self,
        calls: &[CallRecord],
        lookup: PriceLookup,
        market: &dyn MarketData,
        now: DateTime<Utc>,
    ) -> PerformanceOutcome {
        if calls.is_empty() {
            return PerformanceOutcome::NoCalls;
        }

        info!(?lookup, "📊 Analyzing call performance");

        let mut results: Vec<CallPerformance> = Vec::with_capacity(calls.len());
        let mut skipped = 0;

        for call in calls {
            self.pacer.wait_turn().await;

            let lookup_result = with_timeout(self.call_timeout, self.current_price(call, lookup, market)).await;
            self.pacer.record(&lookup_result).await;

            let current_price = match lookup_result {
                Ok(Some(price)) => price,
                Ok(None) => {
                    debug!(symbol = %call.symbol, "No usable price on target chain");
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(symbol = %call.symbol, error = %e, transient = e.is_transient(), "Error fetching price for call");
                    skipped += 1;
                    continue;
                }
            };

            let Some(gain) = gain_pct(call.initial_price, current_price) else {
                debug!(symbol = %call.symbol, initial_price = call.initial_price, current_price, "Non-positive price, skipping");
                skipped += 1;
                continue;
            };

            results.push(CallPerformance {
                symbol: call.symbol.clone(),
                name: call.name.clone(),
                tier: call.tier,
                initial_price: call.initial_price,
                current_price,
                gain_pct: gain,
                called_at: call.called_at,
                hours_since_call: now.signed_duration_since(call.called_at).num_seconds() as f64 / 3600.0,
            });
        }

        match summarize(results, lookup, self.top_n, skipped) {
            Some(report) => {
                info!(
                    priced = report.summary.count,
                    skipped = report.skipped,
                    average_gain_pct = report.summary.average_gain_pct,
                    "📊 Performance report ready"
                );
                PerformanceOutcome::Report(report)
            }
            None => PerformanceOutcome::PricesUnavailable { attempted: calls.len() },
        }
    }

    async fn current_price(
        &self,
        call: &CallRecord,
        lookup: PriceLookup,
        market: &dyn MarketData,
    ) -> Result<Option<f64>, TrackerError> {
        let pair = match lookup {
            PriceLookup::ByPair => {
                if call.pair_address.is_empty() {
                    return Ok(None);
                }
                market
                    .pair_by_address(&self.chain_id, &call.pair_address)
                    .await?
                    .filter(|pair| pair.chain_id == self.chain_id)
            }
            PriceLookup::ByToken => {
                if call.token_address.is_empty() {
                    return Ok(None);
                }
                market
                    .pairs_by_token(&call.token_address)
                    .await?
                    .into_iter()
                    .find(|pair| pair.chain_id == self.chain_id)
            }
        };

        Ok(pair.and_then(|p| p.price_usd_value()))
    }
}
