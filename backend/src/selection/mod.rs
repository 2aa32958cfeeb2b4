//! Object-level selection
//!
//! Builds the per-event candidate collections (`SelectedObjects`) that the
//! event-level criteria are evaluated on. Object calibration lives upstream;
//! this module only applies kinematic and quality thresholds.
//!
//! # Selection Interface
//!
//! ```rust
//! use hlfv_selector_core::models::{Event, SelectedObjects};
//! use hlfv_selector_core::selection::ObjectSelector;
//!
//! struct KeepEverything;
//!
//! impl ObjectSelector for KeepEverything {
//!     fn select(&self, event: &Event) -> SelectedObjects {
//!         SelectedObjects {
//!             baseline_leptons: event.leptons.clone(),
//!             signal_leptons: event.leptons.clone(),
//!             n_taus: event.n_taus,
//!         }
//!     }
//! }
//! ```

use crate::models::{Event, Flavor, Lepton, SelectedObjects};
use serde::{Deserialize, Serialize};

/// Produces candidate object collections for one event
pub trait ObjectSelector {
    /// Select baseline/signal objects; must not depend on other events
    fn select(&self, event: &Event) -> SelectedObjects;
}

/// Kinematic thresholds for the baseline selector (GeV)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectCuts {
    pub baseline_pt_min: f64,
    pub signal_pt_min: f64,
    pub electron_eta_max: f64,
    pub muon_eta_max: f64,
    /// Signal leptons must be isolated
    pub signal_requires_isolation: bool,
}

impl Default for ObjectCuts {
    fn default() -> Self {
        Self {
            baseline_pt_min: 10.0,
            signal_pt_min: 20.0,
            electron_eta_max: 2.47,
            muon_eta_max: 2.4,
            signal_requires_isolation: true,
        }
    }
}

/// Threshold-based lepton selection
///
/// # Example
///
/// ```
/// use hlfv_selector_core::models::{Event, Flavor, Lepton};
/// use hlfv_selector_core::selection::{BaselineObjectSelector, ObjectSelector};
///
/// let mut event = Event::data(1, 1);
/// event.leptons.push(Lepton::new(Flavor::Muon, 15.0, 0.5, 0.0, 1));
/// event.leptons.push(Lepton::new(Flavor::Electron, 35.0, 0.1, 2.0, -1));
///
/// let objects = BaselineObjectSelector::default().select(&event);
/// assert_eq!(objects.baseline_leptons.len(), 2);
/// assert_eq!(objects.signal_leptons.len(), 1);
/// assert_eq!(objects.baseline_leptons[0].flavor, Flavor::Electron); // pt ordered
/// ```
#[derive(Debug, Clone, Default)]
pub struct BaselineObjectSelector {
    cuts: ObjectCuts,
}

impl BaselineObjectSelector {
    pub fn new(cuts: ObjectCuts) -> Self {
        Self { cuts }
    }

    pub fn cuts(&self) -> &ObjectCuts {
        &self.cuts
    }

    fn is_baseline(&self, lepton: &Lepton) -> bool {
        let eta_max = match lepton.flavor {
            Flavor::Electron => self.cuts.electron_eta_max,
            Flavor::Muon => self.cuts.muon_eta_max,
        };
        lepton.pt > self.cuts.baseline_pt_min && lepton.eta.abs() < eta_max
    }

    fn is_signal(&self, lepton: &Lepton) -> bool {
        lepton.pt > self.cuts.signal_pt_min
            && (lepton.isolated || !self.cuts.signal_requires_isolation)
    }
}

impl ObjectSelector for BaselineObjectSelector {
    fn select(&self, event: &Event) -> SelectedObjects {
        let mut baseline: Vec<Lepton> = event
            .leptons
            .iter()
            .filter(|l| self.is_baseline(l))
            .cloned()
            .collect();
        baseline.sort_by(|a, b| b.pt.total_cmp(&a.pt));

        let signal = baseline
            .iter()
            .filter(|l| self.is_signal(l))
            .cloned()
            .collect();

        SelectedObjects {
            baseline_leptons: baseline,
            signal_leptons: signal,
            n_taus: event.n_taus,
        }
    }
}
