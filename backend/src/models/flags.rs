//! Selection stages and per-event stage decisions
//!
//! The cutflow is a fixed, ordered set of stages. `Stage::ALL` is the
//! registration order used by the cutflow counter and the report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of cutflow stages
pub const STAGE_COUNT: usize = 13;

/// One step of the event-level selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Every processed event
    Input,
    /// Good-run list
    Grl,
    /// No LAr or tile calorimeter error
    DetectorErrors,
    /// Primary vertex with enough tracks
    GoodVertex,
    BadJetVeto,
    BadMuonVeto,
    CosmicMuonVeto,
    /// Exactly two baseline leptons
    TwoBaselineLeptons,
    /// Dilepton trigger matched to the baseline leptons
    Trigger,
    /// Exactly two signal leptons
    TwoSignalLeptons,
    OppositeSign,
    /// Dilepton invariant mass above threshold
    MllMin,
    TauVeto,
}

impl Stage {
    /// Fixed cutflow order
    pub const ALL: [Stage; STAGE_COUNT] = [
        Stage::Input,
        Stage::Grl,
        Stage::DetectorErrors,
        Stage::GoodVertex,
        Stage::BadJetVeto,
        Stage::BadMuonVeto,
        Stage::CosmicMuonVeto,
        Stage::TwoBaselineLeptons,
        Stage::Trigger,
        Stage::TwoSignalLeptons,
        Stage::OppositeSign,
        Stage::MllMin,
        Stage::TauVeto,
    ];

    /// Stable name used as the cutflow counter key
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Grl => "grl",
            Stage::DetectorErrors => "detector_errors",
            Stage::GoodVertex => "good_vertex",
            Stage::BadJetVeto => "bad_jet_veto",
            Stage::BadMuonVeto => "bad_muon_veto",
            Stage::CosmicMuonVeto => "cosmic_muon_veto",
            Stage::TwoBaselineLeptons => "two_baseline_leptons",
            Stage::Trigger => "trigger",
            Stage::TwoSignalLeptons => "two_signal_leptons",
            Stage::OppositeSign => "opposite_sign",
            Stage::MllMin => "mll_min",
            Stage::TauVeto => "tau_veto",
        }
    }

    /// Position in the fixed cutflow order
    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage decisions for one event
///
/// Computed once per event, after the object selection, and never mutated
/// afterwards.
///
/// # Example
///
/// ```rust
/// use hlfv_selector_core::models::{EventFlags, Stage};
///
/// let flags = EventFlags::all_passing().with(Stage::Trigger, false);
/// assert!(!flags.passes_all());
/// assert!(flags.passes_before(Stage::Trigger));
/// assert!(!flags.passes_before(Stage::TwoSignalLeptons));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFlags {
    decisions: [bool; STAGE_COUNT],
}

impl EventFlags {
    /// Every stage passing
    pub fn all_passing() -> Self {
        Self {
            decisions: [true; STAGE_COUNT],
        }
    }

    /// Only the `Input` stage passing
    pub fn none_passing() -> Self {
        let mut decisions = [false; STAGE_COUNT];
        decisions[Stage::Input.position()] = true;
        Self { decisions }
    }

    /// Builder: set one stage decision
    ///
    /// `Input` always passes; attempts to fail it are ignored.
    pub fn with(mut self, stage: Stage, pass: bool) -> Self {
        if stage != Stage::Input {
            self.decisions[stage.position()] = pass;
        }
        self
    }

    /// Decision for one stage
    pub fn passes(&self, stage: Stage) -> bool {
        self.decisions[stage.position()]
    }

    /// Whether every stage strictly before `stage` passed
    pub fn passes_before(&self, stage: Stage) -> bool {
        self.decisions[..stage.position()].iter().all(|&d| d)
    }

    /// Whether every stage up to and including `stage` passed
    pub fn passes_through(&self, stage: Stage) -> bool {
        self.passes_before(stage) && self.passes(stage)
    }

    /// Logical AND of every stage
    pub fn passes_all(&self) -> bool {
        self.decisions.iter().all(|&d| d)
    }

    /// First stage that failed, in cutflow order
    pub fn first_failure(&self) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|s| !self.passes(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_positions() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.position(), i);
        }
    }

    #[test]
    fn test_stage_names_unique() {
        let names: std::collections::HashSet<_> = Stage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), Stage::ALL.len());
    }

    #[test]
    fn test_input_cannot_fail() {
        let flags = EventFlags::all_passing().with(Stage::Input, false);
        assert!(flags.passes(Stage::Input));
        assert!(EventFlags::none_passing().passes(Stage::Input));
    }

    #[test]
    fn test_first_failure() {
        let flags = EventFlags::all_passing()
            .with(Stage::MllMin, false)
            .with(Stage::GoodVertex, false);
        assert_eq!(flags.first_failure(), Some(Stage::GoodVertex));
        assert_eq!(EventFlags::all_passing().first_failure(), None);
        assert_eq!(EventFlags::none_passing().first_failure(), Some(Stage::Grl));
    }

    #[test]
    fn test_passes_through() {
        let flags = EventFlags::all_passing().with(Stage::Trigger, false);
        assert!(flags.passes_through(Stage::TwoBaselineLeptons));
        assert!(!flags.passes_through(Stage::Trigger));
        assert!(flags.passes(Stage::MllMin));
        assert!(!flags.passes_through(Stage::MllMin));
    }
}
