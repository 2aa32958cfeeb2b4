//! Decomposed normalization weight of one event
//!
//! # Critical Invariants
//!
//! - `total()` is always the product of the named factors; it is never
//!   stored separately.
//! - Collision data carries the unit weight (every factor 1.0).

use serde::{Deserialize, Serialize};

/// Weight factors for a single event
///
/// # Example
///
/// ```rust
/// use hlfv_selector_core::models::WeightComponents;
///
/// let w = WeightComponents {
///     generator: 2.0,
///     normalization: 0.5,
///     ..WeightComponents::unit()
/// };
/// assert_eq!(w.total(), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightComponents {
    /// Generator (matrix element) weight
    pub generator: f64,

    /// Pileup reweighting factor
    pub pileup: f64,

    /// Cross section × k-factor × filter efficiency × luminosity / sum of generator weights
    pub normalization: f64,

    /// Lepton reconstruction/identification efficiency scale factor
    pub lepton_sf: f64,

    /// Trigger efficiency scale factor
    pub trigger: f64,

    /// b-tagging scale factor
    pub btag: f64,
}

impl WeightComponents {
    /// Every factor set to 1.0
    pub fn unit() -> Self {
        Self {
            generator: 1.0,
            pileup: 1.0,
            normalization: 1.0,
            lepton_sf: 1.0,
            trigger: 1.0,
            btag: 1.0,
        }
    }

    /// The named factors, in declaration order
    pub fn factors(&self) -> [(&'static str, f64); 6] {
        [
            ("generator", self.generator),
            ("pileup", self.pileup),
            ("normalization", self.normalization),
            ("lepton_sf", self.lepton_sf),
            ("trigger", self.trigger),
            ("btag", self.btag),
        ]
    }

    /// Combined event weight
    pub fn total(&self) -> f64 {
        self.factors().iter().map(|(_, f)| f).product()
    }
}

impl Default for WeightComponents {
    fn default() -> Self {
        Self::unit()
    }
}
