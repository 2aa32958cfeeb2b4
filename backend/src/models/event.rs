//! Raw event record as read from the event source.
//!
//! An `Event` carries everything the selector needs for one collision:
//! bookkeeping identifiers, the per-event scale factors stored by the
//! upstream production, data-quality decisions, trigger bits, and the
//! reconstructed light leptons.
//!
//! # Example
//!
//! ```rust
//! use hlfv_selector_core::models::{Event, Flavor, Lepton};
//!
//! let mut event = Event::data(200_842, 17);
//! event.leptons.push(Lepton::new(Flavor::Electron, 42.0, 0.3, 1.2, -1));
//! event.leptons.push(Lepton::new(Flavor::Muon, 31.5, -1.1, -2.0, 1));
//!
//! assert!(!event.is_mc());
//! assert_eq!(event.leptons.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

/// Light lepton flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    Electron,
    Muon,
}

/// Electron mass in GeV
pub const ELECTRON_MASS: f64 = 0.000_511;

/// Muon mass in GeV
pub const MUON_MASS: f64 = 0.105_658;

impl Flavor {
    /// Rest mass in GeV
    pub fn mass(&self) -> f64 {
        match self {
            Flavor::Electron => ELECTRON_MASS,
            Flavor::Muon => MUON_MASS,
        }
    }
}

/// Reconstructed light lepton
///
/// Momenta are in GeV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lepton {
    pub flavor: Flavor,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub charge: i8,
    /// Passes the isolation requirement
    #[serde(default = "default_true")]
    pub isolated: bool,
}

fn default_true() -> bool {
    true
}

impl Lepton {
    /// Create an isolated lepton
    pub fn new(flavor: Flavor, pt: f64, eta: f64, phi: f64, charge: i8) -> Self {
        Self {
            flavor,
            pt,
            eta,
            phi,
            charge,
            isolated: true,
        }
    }

    /// Cartesian four-momentum `(E, px, py, pz)`
    pub fn four_momentum(&self) -> [f64; 4] {
        let px = self.pt * self.phi.cos();
        let py = self.pt * self.phi.sin();
        let pz = self.pt * self.eta.sinh();
        let m = self.flavor.mass();
        let e = (px * px + py * py + pz * pz + m * m).sqrt();
        [e, px, py, pz]
    }
}

/// Invariant mass of a lepton pair in GeV
pub fn invariant_mass(a: &Lepton, b: &Lepton) -> f64 {
    let pa = a.four_momentum();
    let pb = b.four_momentum();
    let e = pa[0] + pb[0];
    let px = pa[1] + pb[1];
    let py = pa[2] + pb[2];
    let pz = pa[3] + pb[3];
    (e * e - px * px - py * py - pz * pz).max(0.0).sqrt()
}

/// One recorded collision event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub run_number: u32,
    pub event_number: u64,

    /// MC sample identifier (None = collision data)
    #[serde(default)]
    pub mc_channel: Option<u32>,

    // Scale factors stored by the upstream production (1.0 for data)
    #[serde(default = "unit")]
    pub generator_weight: f64,
    #[serde(default = "unit")]
    pub pileup_weight: f64,
    #[serde(default = "unit")]
    pub lepton_sf: f64,
    #[serde(default = "unit")]
    pub trigger_sf: f64,
    #[serde(default = "unit")]
    pub btag_sf: f64,

    // Data-quality decisions
    #[serde(default = "default_true")]
    pub passes_grl: bool,
    #[serde(default)]
    pub lar_error: bool,
    #[serde(default)]
    pub tile_error: bool,
    #[serde(default = "default_true")]
    pub has_good_vertex: bool,
    #[serde(default)]
    pub bad_jet: bool,
    #[serde(default)]
    pub bad_muon: bool,
    #[serde(default)]
    pub cosmic_muon: bool,

    /// Fired trigger chains, one bit per chain
    #[serde(default)]
    pub trigger_bits: u32,

    #[serde(default)]
    pub leptons: Vec<Lepton>,

    #[serde(default)]
    pub n_taus: u32,
}

fn unit() -> f64 {
    1.0
}

impl Event {
    /// Clean collision-data event with no objects
    pub fn data(run_number: u32, event_number: u64) -> Self {
        Self {
            run_number,
            event_number,
            mc_channel: None,
            generator_weight: 1.0,
            pileup_weight: 1.0,
            lepton_sf: 1.0,
            trigger_sf: 1.0,
            btag_sf: 1.0,
            passes_grl: true,
            lar_error: false,
            tile_error: false,
            has_good_vertex: true,
            bad_jet: false,
            bad_muon: false,
            cosmic_muon: false,
            trigger_bits: 0,
            leptons: Vec::new(),
            n_taus: 0,
        }
    }

    /// Clean simulated event from sample `mc_channel`
    pub fn mc(mc_channel: u32, event_number: u64, generator_weight: f64) -> Self {
        Self {
            mc_channel: Some(mc_channel),
            generator_weight,
            ..Self::data(0, event_number)
        }
    }

    /// Whether this event is simulated
    pub fn is_mc(&self) -> bool {
        self.mc_channel.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_mass_back_to_back() {
        let a = Lepton::new(Flavor::Muon, 45.0, 0.0, 0.0, 1);
        let b = Lepton::new(Flavor::Muon, 45.0, 0.0, std::f64::consts::PI, -1);
        let mll = invariant_mass(&a, &b);
        assert!((mll - 90.0).abs() < 1e-3, "mll = {}", mll);
    }

    #[test]
    fn test_event_deserialize_defaults() {
        let json = r#"{"run_number": 1, "event_number": 2}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event, Event::data(1, 2));
    }

    #[test]
    fn test_mc_event() {
        let event = Event::mc(410_000, 5, 0.8);
        assert!(event.is_mc());
        assert_eq!(event.generator_weight, 0.8);
        assert!(event.passes_grl);
    }
}
