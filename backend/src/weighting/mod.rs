//! Sample normalization
//!
//! Simulated events are normalized to the integrated luminosity of the
//! data:
//!
//! ```text
//! normalization = xsec × kfactor × efficiency × luminosity / Σ generator weights
//! ```
//!
//! # Critical Invariants
//!
//! - The sum of generator weights is taken over the **unfiltered** source:
//!   every entry is visited exactly once, whatever event list is in use
//!   later. A filtered sum would mis-normalize every weighted count.
//! - A weighter is initialized once per run. Asking for a normalization
//!   before initialization is an error.

use crate::models::Event;
use crate::source::{EventSource, SourceError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors computing normalization weights
#[derive(Debug, Error)]
pub enum WeightError {
    #[error("Cannot read cross-section table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed cross-section table: {0}")]
    Parse(String),

    #[error("Invalid luminosity: {0} pb^-1")]
    InvalidLuminosity(f64),

    #[error("No cross section for MC channel {0}")]
    MissingCrossSection(u32),

    #[error("Sum of generator weights for MC channel {channel} is {sumw}, must be positive")]
    NonPositiveSumw { channel: u32, sumw: f64 },

    #[error("Weighter already initialized")]
    AlreadyInitialized,

    #[error("Weighter used before initialization")]
    NotInitialized,

    #[error("Source error during weighter initialization: {0}")]
    Source(#[from] SourceError),
}

/// Provides the per-event normalization factor
pub trait Weighter {
    /// Scan the full, unfiltered source once
    fn initialize(&mut self, source: &dyn EventSource) -> Result<(), WeightError>;

    fn is_initialized(&self) -> bool;

    /// Forget the previous scan so the weighter can serve a new run
    fn reset(&mut self);

    /// Normalization factor for `event` (1.0 for collision data)
    fn normalization(&self, event: &Event) -> Result<f64, WeightError>;
}

/// Cross section for one MC sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    /// Cross section in pb
    pub xsec_pb: f64,
    #[serde(default = "unit")]
    pub kfactor: f64,
    /// Generator filter efficiency
    #[serde(default = "unit")]
    pub efficiency: f64,
}

fn unit() -> f64 {
    1.0
}

impl CrossSection {
    /// Effective cross section in pb
    pub fn effective(&self) -> f64 {
        self.xsec_pb * self.kfactor * self.efficiency
    }
}

/// Cross sections keyed by MC channel
///
/// JSON form: `{"410000": {"xsec_pb": 252.9, "kfactor": 1.2}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossSectionTable {
    entries: BTreeMap<u32, CrossSection>,
}

impl CrossSectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add or replace one channel
    pub fn with(mut self, channel: u32, xsec: CrossSection) -> Self {
        self.entries.insert(channel, xsec);
        self
    }

    pub fn get(&self, channel: u32) -> Option<&CrossSection> {
        self.entries.get(&channel)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self, WeightError> {
        serde_json::from_str(json).map_err(|e| WeightError::Parse(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, WeightError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Normalization from a cross-section table and the luminosity
///
/// # Example
///
/// ```
/// use hlfv_selector_core::models::Event;
/// use hlfv_selector_core::source::VecEventSource;
/// use hlfv_selector_core::weighting::{CrossSection, CrossSectionTable, McWeighter, Weighter};
///
/// let table = CrossSectionTable::new().with(
///     410_000,
///     CrossSection { xsec_pb: 10.0, kfactor: 1.0, efficiency: 1.0 },
/// );
/// let mut weighter = McWeighter::new(table, 2.0).unwrap();
///
/// let source = VecEventSource::new(
///     "ttbar",
///     vec![Event::mc(410_000, 0, 1.0), Event::mc(410_000, 1, 3.0)],
/// );
/// weighter.initialize(&source).unwrap();
///
/// // 10 pb × 2 pb^-1 / 4
/// assert_eq!(weighter.normalization(&Event::mc(410_000, 0, 1.0)).unwrap(), 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct McWeighter {
    table: CrossSectionTable,
    luminosity_pb: f64,
    sumw: BTreeMap<u32, f64>,
    initialized: bool,
}

impl McWeighter {
    /// `luminosity_pb` is the integrated luminosity in pb^-1
    pub fn new(table: CrossSectionTable, luminosity_pb: f64) -> Result<Self, WeightError> {
        if !(luminosity_pb.is_finite() && luminosity_pb > 0.0) {
            return Err(WeightError::InvalidLuminosity(luminosity_pb));
        }
        Ok(Self {
            table,
            luminosity_pb,
            sumw: BTreeMap::new(),
            initialized: false,
        })
    }

    pub fn luminosity_pb(&self) -> f64 {
        self.luminosity_pb
    }

    /// Sum of generator weights for a channel, once initialized
    pub fn sumw(&self, channel: u32) -> Option<f64> {
        self.sumw.get(&channel).copied()
    }
}

impl Weighter for McWeighter {
    fn initialize(&mut self, source: &dyn EventSource) -> Result<(), WeightError> {
        if self.initialized {
            return Err(WeightError::AlreadyInitialized);
        }

        let mut sumw: BTreeMap<u32, f64> = BTreeMap::new();
        for index in 0..source.entries() {
            let event = source.read(index)?;
            if let Some(channel) = event.mc_channel {
                *sumw.entry(channel).or_insert(0.0) += event.generator_weight;
            }
        }

        for (&channel, &total) in &sumw {
            if self.table.get(channel).is_none() {
                return Err(WeightError::MissingCrossSection(channel));
            }
            if !(total > 0.0) {
                return Err(WeightError::NonPositiveSumw {
                    channel,
                    sumw: total,
                });
            }
        }

        tracing::debug!(
            source = source.name(),
            entries = source.entries(),
            channels = sumw.len(),
            "weighter initialized"
        );

        self.sumw = sumw;
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn reset(&mut self) {
        self.sumw.clear();
        self.initialized = false;
    }

    fn normalization(&self, event: &Event) -> Result<f64, WeightError> {
        if !self.initialized {
            return Err(WeightError::NotInitialized);
        }
        let channel = match event.mc_channel {
            Some(channel) => channel,
            None => return Ok(1.0),
        };
        let xsec = self
            .table
            .get(channel)
            .ok_or(WeightError::MissingCrossSection(channel))?;
        let sumw = self
            .sumw
            .get(&channel)
            .copied()
            .ok_or(WeightError::NonPositiveSumw { channel, sumw: 0.0 })?;
        Ok(xsec.effective() * self.luminosity_pb / sumw)
    }
}
