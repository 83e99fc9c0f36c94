/// Market-data collaborator seam

use async_trait::async_trait;

use crate::core::errors::TrackerError;
use crate::util::dexscreener::TokenPair;

/// Source of pair snapshots. Implemented by the DexScreener client in production
/// and by in-memory fakes in tests.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Free-text search; the caller filters the result to its target chain.
    async fn search(&self, term: &str) -> Result<Vec<TokenPair>, TrackerError>;

    /// Current snapshot of a single pair, `None` when the upstream has no such pair.
    async fn pair_by_address(&self, chain_id: &str, pair_address: &str) -> Result<Option<TokenPair>, TrackerError>;

    /// Every pair trading the given base token, across all chains.
    async fn pairs_by_token(&self, token_address: &str) -> Result<Vec<TokenPair>, TrackerError>;
}
