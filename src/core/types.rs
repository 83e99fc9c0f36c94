use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::dexscreener::TokenPair;

/// Short-window activity estimate derived from a pair's 5m/1h counters.
///
/// A value that exists always has `recent_buys >= 1` and `volume_estimate >= 50`
/// under the default settings; anything weaker is rejected before construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub recent_buys: u64,
    pub volume_estimate: f64,
    pub avg_buy_size: f64,
    pub buys_5min: u64,
    pub buys_1h: u64,
    pub volume_5min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    FirstCall,
    Medium,
    Strong,
    VeryStrong,
}

impl Tier {
    /// Ranking weight used when several candidates qualify in the same cycle.
    pub fn priority(&self) -> u8 {
        match self {
            Tier::VeryStrong => 4,
            Tier::Strong => 3,
            Tier::Medium => 2,
            Tier::FirstCall => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::VeryStrong => "💎 VERY STRONG 💎",
            Tier::Strong => "💎 STRONG",
            Tier::Medium => "💎 MEDIUM",
            Tier::FirstCall => "🔔 FIRST CALL",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Tier::VeryStrong => "VERY_STRONG",
            Tier::Strong => "STRONG",
            Tier::Medium => "MEDIUM",
            Tier::FirstCall => "FIRST_CALL",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyResult {
    pub liquidity_ok: bool,
    pub age_ok: bool,
}

impl SafetyResult {
    pub fn passed(&self) -> bool {
        self.liquidity_ok && self.age_ok
    }
}

/// A qualifying candidate inside one scan cycle. Only the best one is promoted.
#[derive(Debug, Clone)]
pub struct Signal {
    pub pair: TokenPair,
    pub tier: Tier,
    pub metrics: Metrics,
    pub safety: SafetyResult,
    pub priority_rank: u8,
    pub volume_estimate: f64,
}

impl Signal {
    pub fn new(pair: TokenPair, tier: Tier, metrics: Metrics, safety: SafetyResult) -> Self {
        Self {
            pair,
            tier,
            priority_rank: tier.priority(),
            volume_estimate: metrics.volume_estimate,
            metrics,
            safety,
        }
    }

    pub fn pair_address(&self) -> &str {
        &self.pair.pair_address
    }
}

/// A promoted signal kept for later re-pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub token_address: String,
    pub pair_address: String,
    pub symbol: String,
    pub name: String,
    pub initial_price: f64,
    pub called_at: DateTime<Utc>,
    pub tier: Tier,
}

impl CallRecord {
    pub fn from_signal(signal: &Signal, called_at: DateTime<Utc>) -> Self {
        let base = &signal.pair.base_token;
        Self {
            token_address: base.address.clone(),
            pair_address: signal.pair.pair_address.clone(),
            symbol: signal.pair.symbol().to_string(),
            name: base.name.clone(),
            initial_price: signal.pair.price_usd_value().unwrap_or(0.0),
            called_at,
            tier: signal.tier,
        }
    }
}
