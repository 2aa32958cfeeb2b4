//! Selector - the event loop driver
//!
//! See `engine.rs` for the state machine and `config.rs` for its settings.

pub mod config;
pub mod engine;

pub use config::{ConfigError, SelectorConfig};
pub use engine::{EventOutcome, RunSummary, Selector, SelectorError, SelectorState};
