//! Event loop utilities

pub mod progress;
