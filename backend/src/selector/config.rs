//! Selector configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::core::progress::ProgressConfig;
use crate::cutflow::CutFlowMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Selector run configuration
///
/// # Example
///
/// ```rust
/// use hlfv_selector_core::cutflow::CutFlowMode;
/// use hlfv_selector_core::selector::SelectorConfig;
///
/// let config = SelectorConfig::from_json_str(
///     r#"{"debug": 1, "event_list": "passing.json", "cutflow_mode": "sequential"}"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.debug, 1);
/// assert_eq!(config.cutflow_mode, CutFlowMode::Sequential);
/// assert!(config.event_list_path().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Diagnostic verbosity (0 = quiet); never affects selection results
    pub debug: u8,

    /// Event list file; None or an empty path disables the feature
    pub event_list: Option<PathBuf>,

    pub cutflow_mode: CutFlowMode,

    /// Minimum dilepton invariant mass (GeV)
    pub mll_min: f64,

    pub progress: ProgressConfig,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            debug: 0,
            event_list: None,
            cutflow_mode: CutFlowMode::default(),
            mll_min: 20.0,
            progress: ProgressConfig::default(),
        }
    }
}

impl SelectorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.mll_min.is_finite() && self.mll_min >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "mll_min must be a non-negative number, got {}",
                self.mll_min
            )));
        }
        Ok(())
    }

    /// Configured event list path, if the feature is in use
    pub fn event_list_path(&self) -> Option<&Path> {
        self.event_list
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(SelectorConfig::from_json_str("{}").unwrap(), SelectorConfig::default());
    }

    #[test]
    fn test_empty_event_list_disables() {
        let config = SelectorConfig::from_json_str(r#"{"event_list": ""}"#).unwrap();
        assert!(config.event_list_path().is_none());
    }

    #[test]
    fn test_negative_mll_rejected() {
        assert!(matches!(
            SelectorConfig::from_json_str(r#"{"mll_min": -1.0}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(matches!(
            SelectorConfig::from_json_str(r#"{"cutflow_mode": "random"}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
