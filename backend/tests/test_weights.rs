//! Weight component tests
//!
//! Critical invariants tested:
//! - total() is the product of the named factors
//! - Static assignment is a pure function of (event, weighter)
//! - Normalization sums generator weights over the full source

use hlfv_selector_core::models::{Event, WeightComponents};
use hlfv_selector_core::selector::Selector;
use hlfv_selector_core::source::VecEventSource;
use hlfv_selector_core::weighting::{CrossSection, CrossSectionTable, McWeighter, Weighter};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

const CHANNEL: u32 = 410_000;

fn weighter_for(source: &VecEventSource, xsec_pb: f64, luminosity_pb: f64) -> McWeighter {
    let table = CrossSectionTable::new().with(
        CHANNEL,
        CrossSection {
            xsec_pb,
            kfactor: 1.0,
            efficiency: 1.0,
        },
    );
    let mut weighter = McWeighter::new(table, luminosity_pb).unwrap();
    weighter.initialize(source).unwrap();
    weighter
}

fn mc_event(index: u64, generator_weight: f64) -> Event {
    let mut event = Event::mc(CHANNEL, index, generator_weight);
    event.pileup_weight = 0.9;
    event.lepton_sf = 0.95;
    event.trigger_sf = 0.98;
    event.btag_sf = 1.02;
    event
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_total_is_product_of_factors(
        generator in -5.0f64..5.0,
        pileup in 0.0f64..3.0,
        normalization in 0.0f64..100.0,
        lepton_sf in 0.5f64..1.5,
        trigger in 0.5f64..1.5,
        btag in 0.5f64..1.5,
    ) {
        let w = WeightComponents { generator, pileup, normalization, lepton_sf, trigger, btag };
        let expected = generator * pileup * normalization * lepton_sf * trigger * btag;
        prop_assert!((w.total() - expected).abs() <= 1e-12 * expected.abs().max(1.0));
    }

    #[test]
    fn prop_static_assignment_is_pure(weights in prop::collection::vec(0.1f64..10.0, 1..30), pick in 0usize..30) {
        let events: Vec<Event> = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| mc_event(i as u64, w))
            .collect();
        let source = VecEventSource::new("mc", events.clone());
        let weighter = weighter_for(&source, 10.0, 1.0);

        let event = &events[pick % events.len()];
        let first = Selector::assign_static_weight_components(event, &weighter).unwrap();
        // Evaluating other events in between does not change the result
        for other in &events {
            Selector::assign_static_weight_components(other, &weighter).unwrap();
        }
        let second = Selector::assign_static_weight_components(event, &weighter).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ============================================================================
// Assignment
// ============================================================================

#[test]
fn test_mc_components_come_from_event_and_normalization() {
    let source = VecEventSource::new("mc", vec![mc_event(0, 2.0), mc_event(1, 6.0)]);
    let weighter = weighter_for(&source, 40.0, 2.0);

    let w = Selector::assign_static_weight_components(&source.events()[0], &weighter).unwrap();
    assert_eq!(w.generator, 2.0);
    assert_eq!(w.pileup, 0.9);
    assert_eq!(w.lepton_sf, 0.95);
    assert_eq!(w.trigger, 0.98);
    assert_eq!(w.btag, 1.02);
    // 40 pb × 2 pb^-1 / (2 + 6)
    assert!((w.normalization - 10.0).abs() < 1e-12);
}

#[test]
fn test_normalization_uses_full_source() {
    let events: Vec<Event> = (0..5).map(|i| mc_event(i, 1.0)).collect();
    let full = VecEventSource::new("full", events.clone());
    let subset = VecEventSource::new("subset", events[..1].to_vec());

    let w_full = weighter_for(&full, 5.0, 1.0);
    let w_subset = weighter_for(&subset, 5.0, 1.0);

    assert_eq!(w_full.normalization(&events[0]).unwrap(), 1.0);
    assert_eq!(w_subset.normalization(&events[0]).unwrap(), 5.0);
}

#[test]
fn test_assignment_before_initialization_fails() {
    let weighter = McWeighter::new(CrossSectionTable::new(), 1.0).unwrap();
    assert!(Selector::assign_static_weight_components(&Event::data(1, 1), &weighter).is_err());
}
