//! Dilepton trigger decision
//!
//! The trigger collaborator decides whether the event fired a chain that
//! matches the flavor of its two leading baseline leptons, with offline
//! thresholds above the chain's turn-on.

use crate::models::{Event, Flavor, Lepton};
use serde::{Deserialize, Serialize};

/// Pass/fail trigger decision for one event
pub trait TriggerLogic {
    /// `leptons` are the baseline leptons, leading pt first
    fn passes(&self, event: &Event, leptons: &[Lepton]) -> bool;
}

/// One trigger chain: bit in `Event::trigger_bits` plus offline pt thresholds (GeV)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerChain {
    pub bit: u8,
    pub leading_pt_min: f64,
    pub subleading_pt_min: f64,
}

impl TriggerChain {
    fn fired(&self, event: &Event) -> bool {
        self.bit < 32 && event.trigger_bits & (1 << self.bit) != 0
    }

    fn on_plateau(&self, leading: &Lepton, subleading: &Lepton) -> bool {
        leading.pt > self.leading_pt_min && subleading.pt > self.subleading_pt_min
    }
}

/// Chains used per dilepton flavor channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerMenu {
    pub ee: TriggerChain,
    pub mumu: TriggerChain,
    pub emu: TriggerChain,
}

impl Default for TriggerMenu {
    fn default() -> Self {
        Self {
            ee: TriggerChain {
                bit: 0,
                leading_pt_min: 14.0,
                subleading_pt_min: 14.0,
            },
            mumu: TriggerChain {
                bit: 1,
                leading_pt_min: 18.0,
                subleading_pt_min: 8.0,
            },
            emu: TriggerChain {
                bit: 2,
                leading_pt_min: 14.0,
                subleading_pt_min: 8.0,
            },
        }
    }
}

/// Flavor-matched dilepton trigger logic
///
/// # Example
///
/// ```
/// use hlfv_selector_core::models::{Event, Flavor, Lepton};
/// use hlfv_selector_core::trigger::{DileptonTriggerLogic, TriggerLogic};
///
/// let logic = DileptonTriggerLogic::default();
/// let mut event = Event::data(1, 1);
/// event.trigger_bits = 1 << 2; // emu chain
/// let leptons = vec![
///     Lepton::new(Flavor::Electron, 30.0, 0.0, 0.0, 1),
///     Lepton::new(Flavor::Muon, 20.0, 0.0, 3.0, -1),
/// ];
/// assert!(logic.passes(&event, &leptons));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DileptonTriggerLogic {
    menu: TriggerMenu,
}

impl DileptonTriggerLogic {
    pub fn new(menu: TriggerMenu) -> Self {
        Self { menu }
    }

    fn chain_for(&self, a: Flavor, b: Flavor) -> &TriggerChain {
        match (a, b) {
            (Flavor::Electron, Flavor::Electron) => &self.menu.ee,
            (Flavor::Muon, Flavor::Muon) => &self.menu.mumu,
            _ => &self.menu.emu,
        }
    }
}

impl TriggerLogic for DileptonTriggerLogic {
    fn passes(&self, event: &Event, leptons: &[Lepton]) -> bool {
        let (leading, subleading) = match leptons {
            [l0, l1, ..] => (l0, l1),
            _ => return false,
        };
        let chain = self.chain_for(leading.flavor, subleading.flavor);
        chain.fired(event) && chain.on_plateau(leading, subleading)
    }
}
