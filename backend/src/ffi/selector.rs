//! PyO3 entry points for the selector
//!
//! # Example (from Python)
//!
//! ```python
//! import json
//! from hlfv_selector_core import run_selection, cutflow_stages
//!
//! events = "\n".join(json.dumps(e) for e in my_events)
//! result = json.loads(run_selection(events, '{"debug": 0}', '{"410000": {"xsec_pb": 252.9}}', 20300.0))
//! for row in result["report"]["rows"]:
//!     print(row["name"], row["raw"], row["weighted"])
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde_json::json;

use crate::models::Stage;
use crate::selector::{Selector, SelectorConfig};
use crate::source::VecEventSource;
use crate::weighting::{CrossSectionTable, McWeighter};

/// Run a full selection
///
/// # Arguments
///
/// * `events_jsonl` - One event JSON object per line
/// * `config_json` - Selector configuration (`{}` for defaults)
/// * `cross_sections_json` - Cross sections keyed by MC channel
/// * `luminosity_pb` - Integrated luminosity in pb^-1
///
/// # Returns
///
/// JSON string with `visited`, `accepted`, `event_list_mode` and `report`.
///
/// # Errors
///
/// Raises ValueError for malformed inputs and RuntimeError if the run fails.
#[pyfunction]
#[pyo3(name = "run_selection")]
pub fn py_run_selection(
    events_jsonl: &str,
    config_json: &str,
    cross_sections_json: &str,
    luminosity_pb: f64,
) -> PyResult<String> {
    let source = VecEventSource::from_json_lines("python", events_jsonl.as_bytes())
        .map_err(|e| PyValueError::new_err(format!("Invalid events: {}", e)))?;
    let config = SelectorConfig::from_json_str(config_json)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let table = CrossSectionTable::from_json_str(cross_sections_json)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let weighter = McWeighter::new(table, luminosity_pb)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let mut selector = Selector::new(config, Box::new(weighter))
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let summary = selector
        .run(&source)
        .map_err(|e| PyRuntimeError::new_err(format!("Selection failed: {}", e)))?;

    let result = json!({
        "visited": summary.visited,
        "accepted": summary.accepted,
        "event_list_mode": format!("{:?}", summary.event_list_mode).to_lowercase(),
        "report": summary.report,
    });
    Ok(result.to_string())
}

/// Stage names in cutflow order
#[pyfunction]
#[pyo3(name = "cutflow_stages")]
pub fn py_cutflow_stages() -> Vec<&'static str> {
    Stage::ALL.iter().map(|s| s.name()).collect()
}
