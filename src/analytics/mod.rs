pub mod performance_tracker;

pub use performance_tracker::{
    CallPerformance, PerformanceAnalyzer, PerformanceOutcome, PerformanceReport, PerformanceSummary, PriceLookup,
};
