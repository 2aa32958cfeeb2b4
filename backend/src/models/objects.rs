//! Per-event candidate object collections
//!
//! Filled by the object-level selection before any event-level decision
//! is taken. Collections hold copies of the leptons so the event record
//! itself is never mutated.

use crate::models::event::{invariant_mass, Lepton};

/// Candidate objects selected for the current event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedObjects {
    /// Leptons passing the loose (baseline) requirements, leading pt first
    pub baseline_leptons: Vec<Lepton>,

    /// Baseline leptons that also pass the tight (signal) requirements
    pub signal_leptons: Vec<Lepton>,

    /// Number of hadronic taus passing selection
    pub n_taus: u32,
}

impl SelectedObjects {
    /// Empty collections
    pub fn new() -> Self {
        Self::default()
    }

    /// Leading and subleading signal leptons, if there are at least two
    pub fn leading_signal_pair(&self) -> Option<(&Lepton, &Lepton)> {
        match self.signal_leptons.as_slice() {
            [l0, l1, ..] => Some((l0, l1)),
            _ => None,
        }
    }

    /// Invariant mass of the leading signal pair
    pub fn mll(&self) -> Option<f64> {
        self.leading_signal_pair()
            .map(|(l0, l1)| invariant_mass(l0, l1))
    }

    /// Whether the leading signal pair has opposite electric charge
    pub fn is_opposite_sign(&self) -> bool {
        self.leading_signal_pair()
            .map(|(l0, l1)| l0.charge * l1.charge < 0)
            .unwrap_or(false)
    }
}
