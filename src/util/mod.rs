pub mod dexscreener;
pub mod display;
pub mod market_data;
pub mod pacing;

pub use dexscreener::{DexScreenerClient, TokenPair};
pub use market_data::MarketData;
pub use pacing::Pacer;
