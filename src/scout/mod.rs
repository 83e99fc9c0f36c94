pub mod metrics;
pub mod tiers;
pub mod filter;
pub mod scanner;

pub use metrics::MetricsCalculator;
pub use tiers::TierClassifier;
pub use filter::SafetyFilter;
pub use scanner::*;
