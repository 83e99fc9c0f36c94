pub mod errors;
pub mod ledger;
pub mod tracker;
pub mod types;

pub use errors::*;
pub use ledger::{AlertLedger, CallHistory};
pub use tracker::{CallTracker, ScanOutcome, SkipReason, TrackerState};
pub use types::*;
