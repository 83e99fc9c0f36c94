use chrono::{DateTime, Utc};

use crate::config::Safety;
use crate::core::types::SafetyResult;
use crate::util::dexscreener::TokenPair;

/// Liquidity and age gates. Pure checks, no network calls; the selector decides
/// what a failed check means.
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    settings: Safety,
}

impl SafetyFilter {
    pub fn new(settings: Safety) -> Self {
        Self { settings }
    }

    pub fn check(&self, pair: &TokenPair, now: DateTime<Utc>) -> SafetyResult {
        SafetyResult {
            liquidity_ok: pair.liquidity_usd() > self.settings.min_liquidity_usd,
            age_ok: self
                .age_hours(pair, now)
                .map_or(false, |hours| hours < self.settings.max_pair_age_hours),
        }
    }

    pub fn age_hours(&self, pair: &TokenPair, now: DateTime<Utc>) -> Option<f64> {
        let created = pair.created_at()?;
        Some(now.signed_duration_since(created).num_seconds() as f64 / 3600.0)
    }
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::new(Safety::default())
    }
}
