//! FFI (Foreign Function Interface) module
//!
//! PyO3 bindings for driving a selection from Python.
//!
//! # Design Principles
//!
//! 1. **Minimal boundary**: one call runs a complete selection
//! 2. **Simple types**: JSON strings in, JSON string out
//! 3. **Safe errors**: every Rust error becomes a Python exception

pub mod selector;

pub use selector::{py_cutflow_stages, py_run_selection};
