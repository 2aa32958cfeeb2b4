//! HLFV Selector Core - Rust Engine
//!
//! Event-selection driver for a dilepton lepton-flavor-violation analysis:
//! loops over recorded collision events, decides which ones pass the
//! selection, and keeps a weighted cutflow.
//!
//! # Architecture
//!
//! - **core**: Progress reporting for the event loop
//! - **models**: Domain types (Event, EventFlags, WeightComponents)
//! - **source**: Sequential, index-addressable event data
//! - **selection**: Object-level selection (baseline/signal leptons)
//! - **trigger**: Dilepton trigger decision
//! - **weighting**: Sample normalization from cross sections
//! - **cutflow**: Ordered per-stage counters and report
//! - **eventlist**: Persisted list of passing entries
//! - **selector**: The event loop state machine
//!
//! # Critical Invariants
//!
//! 1. Normalization is computed over the full, unfiltered source
//! 2. Entries are processed once each, in increasing order
//! 3. Weight components are a pure function of the event and normalization
//! 4. Debug verbosity never changes selection results

// Module declarations
pub mod core;
pub mod cutflow;
pub mod eventlist;
pub mod models;
pub mod selection;
pub mod selector;
pub mod source;
pub mod trigger;
pub mod weighting;

// Re-exports for convenience
pub use crate::core::progress::{ProgressConfig, ProgressPrinter};
pub use cutflow::{CutFlowCounter, CutFlowError, CutFlowMode, CutFlowReport, StageCount};
pub use eventlist::{EventListError, EventListManager, EventListMode};
pub use models::{Event, EventFlags, Flavor, Lepton, SelectedObjects, Stage, WeightComponents};
pub use selection::{BaselineObjectSelector, ObjectCuts, ObjectSelector};
pub use selector::{
    ConfigError, EventOutcome, RunSummary, Selector, SelectorConfig, SelectorError, SelectorState,
};
pub use source::{EventSource, SourceError, VecEventSource};
pub use trigger::{DileptonTriggerLogic, TriggerLogic, TriggerMenu};
pub use weighting::{CrossSection, CrossSectionTable, McWeighter, WeightError, Weighter};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn hlfv_selector_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ffi::py_run_selection, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::py_cutflow_stages, m)?)?;
    Ok(())
}
