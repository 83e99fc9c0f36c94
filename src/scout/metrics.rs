/// Short-window activity estimation from DexScreener counters

use tracing::debug;

use crate::config::MetricsSettings;
use crate::core::types::Metrics;
use crate::util::dexscreener::TokenPair;

#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    settings: MetricsSettings,
}

impl MetricsCalculator {
    pub fn new(settings: MetricsSettings) -> Self {
        Self { settings }
    }

    /// Estimate recent buys and volume for a pair.
    ///
    /// Returns `None` when the pair lacks sustained 1h activity or the scaled
    /// estimate is too thin to be meaningful. Missing counters read as zero and
    /// therefore reject rather than fail.
    pub fn calculate(&self, pair: &TokenPair) -> Option<Metrics> {
        let buys_5min = pair.buys_5m();
        let buys_1h = pair.buys_1h();

        if buys_1h < self.settings.min_buys_1h {
            debug!(symbol = %pair.symbol(), buys_1h, "Insufficient 1h buy activity");
            return None;
        }

        let volume_5min = pair.volume_5m();
        if !volume_5min.is_finite() || volume_5min < 0.0 {
            debug!(symbol = %pair.symbol(), volume_5min, "Unusable 5m volume");
            return None;
        }

        let scale = self.settings.short_window_scale;
        let recent_buys = (buys_5min as f64 * scale).floor() as u64;
        let volume_estimate = volume_5min * scale;
        let avg_buy_size = if recent_buys > 0 {
            volume_estimate / recent_buys as f64
        } else {
            0.0
        };

        if recent_buys < self.settings.min_recent_buys.max(1)
            || volume_estimate < self.settings.min_volume_estimate
        {
            debug!(
                symbol = %pair.symbol(),
                recent_buys,
                volume_estimate,
                "Estimated short-window activity below floor"
            );
            return None;
        }

        Some(Metrics {
            recent_buys,
            volume_estimate,
            avg_buy_size,
            buys_5min,
            buys_1h,
            volume_5min,
        })
    }
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new(MetricsSettings::default())
    }
}
