/// Configuration loading and defaults

pub mod strategy;

pub use strategy::*;
