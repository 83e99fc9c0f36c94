/// Tracker configuration structures

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::ConfigError;

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub scanner: Scanner,
    pub metrics: MetricsSettings,
    pub tiers: TierSettings,
    pub safety: Safety,
    pub history: History,
    pub performance: Performance,
    pub dexscreener: DexScreenerSettings,
    pub telegram: Telegram,
    pub logging: Logging,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Scanner {
    pub interval_secs: u64,
    pub first_scan_delay_secs: u64,
    pub chain_id: String,
    pub search_terms: Vec<String>,
    pub pairs_per_term: usize,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            first_scan_delay_secs: 10,
            chain_id: "solana".to_string(),
            search_terms: vec![
                "pump".to_string(),
                "raydium".to_string(),
                "orca".to_string(),
                "meteora".to_string(),
            ],
            pairs_per_term: 20,
        }
    }
}

/// Short-window estimation heuristics. The 5-minute counters are scaled down to
/// approximate a 2-3 minute window since nothing finer exists upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub short_window_scale: f64,
    pub min_buys_1h: u64,
    pub min_recent_buys: u64,
    pub min_volume_estimate: f64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            short_window_scale: 0.5,
            min_buys_1h: 5,
            min_recent_buys: 1,
            min_volume_estimate: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TierThreshold {
    pub min_recent_buys: u64,
    pub min_volume: f64,
    pub min_avg_buy: f64,
}

/// Tier thresholds. Each tier section may override any subset of its fields;
/// the rest keep that tier's default.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "TierSettingsFile")]
pub struct TierSettings {
    pub first_call: TierThreshold,
    pub medium: TierThreshold,
    pub strong: TierThreshold,
    /// Matched on recent buys OR volume alone; `min_avg_buy` is ignored.
    pub very_strong: TierThreshold,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            first_call: TierThreshold { min_recent_buys: 20, min_volume: 3000.0, min_avg_buy: 50.0 },
            medium: TierThreshold { min_recent_buys: 30, min_volume: 6000.0, min_avg_buy: 75.0 },
            strong: TierThreshold { min_recent_buys: 45, min_volume: 10000.0, min_avg_buy: 100.0 },
            very_strong: TierThreshold { min_recent_buys: 80, min_volume: 20000.0, min_avg_buy: 0.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
struct TierThresholdOverride {
    min_recent_buys: Option<u64>,
    min_volume: Option<f64>,
    min_avg_buy: Option<f64>,
}

impl TierThresholdOverride {
    fn apply(self, base: TierThreshold) -> TierThreshold {
        TierThreshold {
            min_recent_buys: self.min_recent_buys.unwrap_or(base.min_recent_buys),
            min_volume: self.min_volume.unwrap_or(base.min_volume),
            min_avg_buy: self.min_avg_buy.unwrap_or(base.min_avg_buy),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TierSettingsFile {
    first_call: TierThresholdOverride,
    medium: TierThresholdOverride,
    strong: TierThresholdOverride,
    very_strong: TierThresholdOverride,
}

impl From<TierSettingsFile> for TierSettings {
    fn from(file: TierSettingsFile) -> Self {
        let defaults = TierSettings::default();
        Self {
            first_call: file.first_call.apply(defaults.first_call),
            medium: file.medium.apply(defaults.medium),
            strong: file.strong.apply(defaults.strong),
            very_strong: file.very_strong.apply(defaults.very_strong),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Safety {
    pub min_liquidity_usd: f64,
    pub max_pair_age_hours: f64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 5000.0,
            max_pair_age_hours: 240.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct History {
    pub alert_ledger_capacity: usize,
    pub call_history_capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self {
            alert_ledger_capacity: 100,
            call_history_capacity: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Performance {
    pub top_n: usize,
}

impl Default for Performance {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DexScreenerSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub scan_pacing_ms: u64,
    pub performance_pacing_ms: u64,
}

impl Default for DexScreenerSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.dexscreener.com".to_string(),
            request_timeout_secs: 10,
            scan_pacing_ms: 200,
            performance_pacing_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Telegram {
    pub bot_token: Option<String>,
    pub poll_timeout_secs: u32,
}

impl Default for Telegram {
    fn default() -> Self {
        Self {
            bot_token: None,
            poll_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    pub directory: String,
    pub file_prefix: String,
    pub default_filter: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "smart-money-tracker.log".to_string(),
            default_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing sections and fields keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Read the configuration file, falling back to defaults when it does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Full startup load: file, then environment override for the bot token, then
    /// validation. Fails when no bot token is available.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_token(std::env::var(BOT_TOKEN_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = Some(token);
        }
    }

    pub fn bot_token(&self) -> Result<&str, ConfigError> {
        self.telegram
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingCredential(BOT_TOKEN_ENV))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bot_token()?;

        if self.scanner.chain_id.trim().is_empty() {
            return Err(ConfigError::Invalid("scanner.chain_id must not be empty".into()));
        }
        if self.scanner.search_terms.is_empty() {
            return Err(ConfigError::Invalid("scanner.search_terms must not be empty".into()));
        }
        if self.scanner.interval_secs == 0 {
            return Err(ConfigError::Invalid("scanner.interval_secs must be positive".into()));
        }
        if !(self.metrics.short_window_scale > 0.0) {
            return Err(ConfigError::Invalid("metrics.short_window_scale must be positive".into()));
        }
        if self.history.alert_ledger_capacity == 0 || self.history.call_history_capacity == 0 {
            return Err(ConfigError::Invalid("history capacities must be positive".into()));
        }
        if self.performance.top_n == 0 {
            return Err(ConfigError::Invalid("performance.top_n must be positive".into()));
        }

        Ok(())
    }
}
