/// DexScreener API client used for candidate discovery and re-pricing

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::DexScreenerSettings;
use crate::core::errors::TrackerError;
use crate::util::market_data::MarketData;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "dexId", default)]
    pub dex_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "baseToken")]
    pub base_token: BaseToken,
    #[serde(rename = "quoteToken", default)]
    pub quote_token: Option<QuoteToken>,
    #[serde(rename = "priceUsd", default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub txns: Option<Transactions>,
    #[serde(default)]
    pub volume: Option<Volume>,
    #[serde(default)]
    pub liquidity: Option<Liquidity>,
    #[serde(rename = "marketCap", default)]
    pub market_cap: Option<f64>,
    #[serde(rename = "pairCreatedAt", default)]
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BaseToken {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuoteToken {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Transactions {
    #[serde(default)]
    pub m5: Option<TransactionCount>,
    #[serde(default)]
    pub h1: Option<TransactionCount>,
    #[serde(default)]
    pub h6: Option<TransactionCount>,
    #[serde(default)]
    pub h24: Option<TransactionCount>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionCount {
    #[serde(default)]
    pub buys: u64,
    #[serde(default)]
    pub sells: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Volume {
    #[serde(default)]
    pub h24: Option<f64>,
    #[serde(default)]
    pub h6: Option<f64>,
    #[serde(default)]
    pub h1: Option<f64>,
    #[serde(default)]
    pub m5: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Liquidity {
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub base: Option<f64>,
    #[serde(default)]
    pub quote: Option<f64>,
}

impl TokenPair {
    pub fn symbol(&self) -> &str {
        if self.base_token.symbol.is_empty() {
            "Unknown"
        } else {
            &self.base_token.symbol
        }
    }

    pub fn quote_symbol(&self) -> &str {
        match self.quote_token {
            Some(ref quote) if !quote.symbol.is_empty() => &quote.symbol,
            _ => "USD",
        }
    }

    pub fn buys_5m(&self) -> u64 {
        self.txns.as_ref().and_then(|t| t.m5.as_ref()).map_or(0, |c| c.buys)
    }

    pub fn sells_5m(&self) -> u64 {
        self.txns.as_ref().and_then(|t| t.m5.as_ref()).map_or(0, |c| c.sells)
    }

    pub fn buys_1h(&self) -> u64 {
        self.txns.as_ref().and_then(|t| t.h1.as_ref()).map_or(0, |c| c.buys)
    }

    pub fn volume_5m(&self) -> f64 {
        self.volume.as_ref().and_then(|v| v.m5).unwrap_or(0.0)
    }

    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    pub fn market_cap_usd(&self) -> f64 {
        self.market_cap.unwrap_or(0.0)
    }

    /// USD price parsed from the upstream string; `None` when absent or unparsable.
    pub fn price_usd_value(&self) -> Option<f64> {
        self.price_usd
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|price| price.is_finite())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.pair_created_at
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    }
}

/// Decode every pair in a DexScreener response body.
///
/// Pairs are decoded one by one so a single malformed entry is dropped instead of
/// failing the whole batch. Both the `pairs` array and the single `pair` object
/// shapes are accepted.
pub fn decode_pairs(body: &Value) -> Vec<TokenPair> {
    let mut raw_pairs: Vec<&Value> = Vec::new();

    if let Some(pairs) = body.get("pairs").and_then(Value::as_array) {
        raw_pairs.extend(pairs.iter());
    }
    if let Some(pair) = body.get("pair").filter(|p| p.is_object()) {
        raw_pairs.push(pair);
    }

    let mut decoded: Vec<TokenPair> = Vec::with_capacity(raw_pairs.len());
    for raw in raw_pairs {
        match serde_json::from_value::<TokenPair>(raw.clone()) {
            Ok(pair) => {
                if !decoded.iter().any(|p| p.pair_address == pair.pair_address) {
                    decoded.push(pair);
                }
            }
            Err(e) => {
                let address = raw.get("pairAddress").and_then(Value::as_str).unwrap_or("unknown");
                debug!(pair_address = %address, error = %e, "Dropping malformed pair");
            }
        }
    }

    decoded
}

pub struct DexScreenerClient {
    client: Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(settings: &DexScreenerSettings) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| TrackerError::TransientFetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TrackerError> {
        Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| TrackerError::MalformedData(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn fetch_json(&self, url: Url) -> Result<Value, TrackerError> {
        debug!(url = %url, "Fetching from DexScreener");

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(TrackerError::UpstreamStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body: Value = response.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl MarketData for DexScreenerClient {
    #[instrument(skip(self))]
    async fn search(&self, term: &str) -> Result<Vec<TokenPair>, TrackerError> {
        let mut url = self.endpoint("latest/dex/search")?;
        url.query_pairs_mut().append_pair("q", term);

        let body = self.fetch_json(url).await?;
        Ok(decode_pairs(&body))
    }

    #[instrument(skip(self))]
    async fn pair_by_address(&self, chain_id: &str, pair_address: &str) -> Result<Option<TokenPair>, TrackerError> {
        let url = self.endpoint(&format!("latest/dex/pairs/{}/{}", chain_id, pair_address))?;

        let body = self.fetch_json(url).await?;
        Ok(decode_pairs(&body)
            .into_iter()
            .find(|pair| pair.pair_address == pair_address))
    }

    #[instrument(skip(self))]
    async fn pairs_by_token(&self, token_address: &str) -> Result<Vec<TokenPair>, TrackerError> {
        let url = self.endpoint(&format!("latest/dex/tokens/{}", token_address))?;

        let body = self.fetch_json(url).await?;
        Ok(decode_pairs(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_pair(address: &str) -> Value {
        json!({
            "chainId": "solana",
            "dexId": "raydium",
            "url": format!("https://dexscreener.com/solana/{}", address),
            "pairAddress": address,
            "baseToken": { "address": "Mint111", "name": "Test Token", "symbol": "TEST" },
            "quoteToken": { "address": "So111", "name": "Wrapped SOL", "symbol": "SOL" },
            "priceUsd": "0.00012345",
            "txns": { "m5": { "buys": 60, "sells": 12 }, "h1": { "buys": 400, "sells": 90 } },
            "volume": { "m5": 14000.0, "h1": 90000.0 },
            "liquidity": { "usd": 42000.5 },
            "marketCap": 250000.0,
            "pairCreatedAt": 1_700_000_000_000_i64
        })
    }

    #[test]
    fn test_decode_skips_malformed_pairs() {
        let mut broken = raw_pair("Broken");
        broken["txns"]["m5"]["buys"] = json!("lots");

        let body = json!({ "schemaVersion": "1.0.0", "pairs": [raw_pair("Good"), broken, raw_pair("Other")] });
        let pairs = decode_pairs(&body);

        let addresses: Vec<&str> = pairs.iter().map(|p| p.pair_address.as_str()).collect();
        assert_eq!(addresses, vec!["Good", "Other"]);
    }

    #[test]
    fn test_decode_single_pair_shape() {
        let body = json!({ "schemaVersion": "1.0.0", "pairs": [raw_pair("Abc")], "pair": raw_pair("Abc") });
        let pairs = decode_pairs(&body);
        assert_eq!(pairs.len(), 1);

        let body = json!({ "schemaVersion": "1.0.0", "pairs": null });
        assert!(decode_pairs(&body).is_empty());
    }

    #[test]
    fn test_accessors() {
        let pair: TokenPair = serde_json::from_value(raw_pair("Abc")).unwrap();

        assert_eq!(pair.buys_5m(), 60);
        assert_eq!(pair.sells_5m(), 12);
        assert_eq!(pair.buys_1h(), 400);
        assert_eq!(pair.volume_5m(), 14000.0);
        assert_eq!(pair.liquidity_usd(), 42000.5);
        assert_eq!(pair.price_usd_value(), Some(0.00012345));
        assert_eq!(pair.quote_symbol(), "SOL");
        assert_eq!(pair.created_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_missing_sections_default_to_zero() {
        let pair: TokenPair = serde_json::from_value(json!({
            "chainId": "solana",
            "pairAddress": "Bare",
            "baseToken": { "address": "Mint" },
            "priceUsd": "not-a-number"
        }))
        .unwrap();

        assert_eq!(pair.buys_5m(), 0);
        assert_eq!(pair.buys_1h(), 0);
        assert_eq!(pair.volume_5m(), 0.0);
        assert_eq!(pair.liquidity_usd(), 0.0);
        assert_eq!(pair.price_usd_value(), None);
        assert!(pair.created_at().is_none());
        assert_eq!(pair.symbol(), "Unknown");
        assert_eq!(pair.quote_symbol(), "USD");
    }
}
