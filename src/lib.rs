// Configuration
pub mod config;

// Core state and shared types
pub mod core;

// Candidate evaluation pipeline
pub mod scout;

// Call performance
pub mod analytics;

// Collaborators and rendering
pub mod util;

// Delivery and subscribers
pub mod transport;

// Scheduler and command entry points
pub mod handlers;

pub use crate::config::Config;
pub use crate::core::*;
