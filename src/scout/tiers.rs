/// Ordered tier rules for grading a burst of buying activity

use crate::config::{TierSettings, TierThreshold};
use crate::core::types::{Metrics, Tier};

#[derive(Debug, Clone)]
pub struct TierClassifier {
    settings: TierSettings,
}

impl TierClassifier {
    pub fn new(settings: TierSettings) -> Self {
        Self { settings }
    }

    /// First matching rule wins, strongest first. The thresholds nest, so a pair
    /// that misses a higher tier on one dimension is still checked against the
    /// lower ones.
    pub fn classify(&self, metrics: &Metrics) -> Option<Tier> {
        let very_strong = &self.settings.very_strong;
        if metrics.recent_buys >= very_strong.min_recent_buys
            || metrics.volume_estimate >= very_strong.min_volume
        {
            return Some(Tier::VeryStrong);
        }

        [
            (Tier::Strong, &self.settings.strong),
            (Tier::Medium, &self.settings.medium),
            (Tier::FirstCall, &self.settings.first_call),
        ]
        .into_iter()
        .find(|(_, threshold)| meets_all(metrics, threshold))
        .map(|(tier, _)| tier)
    }
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self::new(TierSettings::default())
    }
}

fn meets_all(metrics: &Metrics, threshold: &TierThreshold) -> bool {
    metrics.recent_buys >= threshold.min_recent_buys
        && metrics.volume_estimate >= threshold.min_volume
        && metrics.avg_buy_size >= threshold.min_avg_buy
}
