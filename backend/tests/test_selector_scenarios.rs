//! End-to-end selection scenarios
//!
//! Runs complete passes over small synthetic sources and checks the
//! cutflow and the event list against hand-computed expectations.

use hlfv_selector_core::eventlist::{EventListManager, EventListMode};
use hlfv_selector_core::models::{Event, Flavor, Lepton, Stage};
use hlfv_selector_core::selector::{Selector, SelectorConfig};
use hlfv_selector_core::source::VecEventSource;
use hlfv_selector_core::trigger::TriggerLogic;
use hlfv_selector_core::weighting::{CrossSection, CrossSectionTable, McWeighter, Weighter};
use hlfv_selector_core::CutFlowMode;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

// ============================================================================
// Test Helpers
// ============================================================================

const CHANNEL: u32 = 410_000;

fn table() -> CrossSectionTable {
    CrossSectionTable::new().with(
        CHANNEL,
        CrossSection {
            xsec_pb: 3.0,
            kfactor: 1.0,
            efficiency: 1.0,
        },
    )
}

fn weighter() -> Box<McWeighter> {
    Box::new(McWeighter::new(table(), 2.0).unwrap())
}

/// Trigger that fires for a fixed set of event numbers
struct ListedTrigger(HashSet<u64>);

impl TriggerLogic for ListedTrigger {
    fn passes(&self, event: &Event, _leptons: &[Lepton]) -> bool {
        self.0.contains(&event.event_number)
    }
}

fn muon(pt: f64, phi: f64, charge: i8, isolated: bool) -> Lepton {
    let mut lepton = Lepton::new(Flavor::Muon, pt, 0.1, phi, charge);
    lepton.isolated = isolated;
    lepton
}

/// Two baseline muons; both are signal only when `two_signal`
fn dimuon_event(index: u64, two_signal: bool) -> Event {
    let mut event = Event::mc(CHANNEL, index, 1.0 + 0.5 * index as f64);
    event.pileup_weight = 1.1;
    event.trigger_bits = 1 << 1;
    event.leptons = vec![muon(45.0, 0.0, 1, true), muon(35.0, 3.0, -1, two_signal)];
    event
}

/// Event passing every stage under the default selection
fn passing_event(index: u64) -> Event {
    dimuon_event(index, true)
}

/// Event with no leptons; fails every lepton stage
fn empty_event(index: u64) -> Event {
    let mut event = Event::mc(CHANNEL, index, 1.0);
    event.trigger_bits = 1 << 1;
    event
}

fn total_weight(source: &VecEventSource, index: u64) -> f64 {
    let mut w = McWeighter::new(table(), 2.0).unwrap();
    w.initialize(source).unwrap();
    Selector::assign_static_weight_components(&source.events()[index as usize], &w)
        .unwrap()
        .total()
}

fn config_with_list(path: &Path) -> SelectorConfig {
    SelectorConfig {
        event_list: Some(path.to_path_buf()),
        ..SelectorConfig::default()
    }
}

// ============================================================================
// Trigger / multiplicity scenario
// ============================================================================

#[test]
fn test_trigger_and_multiplicity_counts() {
    // {1,3,5,7} pass the trigger, {3,7} also have two signal leptons
    let source = VecEventSource::new(
        "ten",
        (0..10).map(|i| dimuon_event(i, i == 3 || i == 7)).collect(),
    );
    let trigger = ListedTrigger([1, 3, 5, 7].into_iter().collect());

    let mut selector = Selector::new(SelectorConfig::default(), weighter())
        .unwrap()
        .with_trigger_logic(Box::new(trigger));
    let summary = selector.run(&source).unwrap();
    let report = &summary.report;

    assert_eq!(report.raw(Stage::Trigger.name()), 4);
    assert_eq!(report.raw(Stage::TwoSignalLeptons.name()), 2);

    let expected_trigger: f64 = [1, 3, 5, 7].iter().map(|&i| total_weight(&source, i)).sum();
    let expected_signal: f64 = [3, 7].iter().map(|&i| total_weight(&source, i)).sum();
    assert!((report.weighted(Stage::Trigger.name()) - expected_trigger).abs() < 1e-9);
    assert!((report.weighted(Stage::TwoSignalLeptons.name()) - expected_signal).abs() < 1e-9);

    assert_eq!(summary.accepted, vec![3, 7]);
}

#[test]
fn test_sequential_mode_counts_cumulatively() {
    // Signal pairs on {0, 3, 7}, trigger on {1, 3, 5, 7}
    let source = VecEventSource::new(
        "ten",
        (0..10).map(|i| dimuon_event(i, i == 0 || i == 3 || i == 7)).collect(),
    );
    let trigger = ListedTrigger([1, 3, 5, 7].into_iter().collect());
    let config = SelectorConfig {
        cutflow_mode: CutFlowMode::Sequential,
        ..SelectorConfig::default()
    };

    let mut selector = Selector::new(config, weighter())
        .unwrap()
        .with_trigger_logic(Box::new(trigger));
    let report = selector.run(&source).unwrap().report;

    assert_eq!(report.raw(Stage::TwoBaselineLeptons.name()), 10);
    assert_eq!(report.raw(Stage::Trigger.name()), 4);
    // Event 0 has a signal pair but failed the trigger earlier
    assert_eq!(report.raw(Stage::TwoSignalLeptons.name()), 2);
    assert_eq!(report.raw(Stage::TauVeto.name()), 2);
}

// ============================================================================
// Produce, then consume
// ============================================================================

#[test]
fn test_produce_then_consume_event_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passing.json");
    let source = VecEventSource::new(
        "five",
        (0..5)
            .map(|i| if i == 2 { passing_event(i) } else { empty_event(i) })
            .collect(),
    );

    let mut producer = Selector::new(config_with_list(&path), weighter()).unwrap();
    let produced = producer.run(&source).unwrap();
    assert_eq!(produced.event_list_mode, EventListMode::Producing);
    assert_eq!(produced.visited, 5);
    assert_eq!(EventListManager::load(&path).unwrap(), Some(BTreeSet::from([2])));

    let mut consumer = Selector::new(config_with_list(&path), weighter()).unwrap();
    let consumed = consumer.run(&source).unwrap();
    assert_eq!(consumed.event_list_mode, EventListMode::Consuming);
    assert_eq!(consumed.visited, 1);
    assert_eq!(consumed.accepted, vec![2]);
    for stage in Stage::ALL {
        assert_eq!(consumed.report.raw(stage.name()), 1, "stage {}", stage);
    }

    // Normalization still comes from all five entries
    let expected = total_weight(&source, 2);
    assert!((consumed.report.weighted(Stage::Input.name()) - expected).abs() < 1e-12);

    // The consumed list is left untouched
    assert_eq!(EventListManager::load(&path).unwrap(), Some(BTreeSet::from([2])));
}

#[test]
fn test_consuming_skips_unlisted_entries_in_manual_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passing.json");
    let source = VecEventSource::new("three", (0..3).map(passing_event).collect());
    EventListManager::save(&path, &BTreeSet::from([1])).unwrap();

    let mut selector = Selector::new(config_with_list(&path), weighter()).unwrap();
    selector.begin().unwrap();
    selector.init(&source).unwrap();
    assert_eq!(selector.event_list_mode(), Some(EventListMode::Consuming));

    let outcomes: Vec<_> = (0..3).map(|i| selector.process(i).unwrap()).collect();
    assert!(!outcomes[0].is_accepted());
    assert!(outcomes[1].is_accepted());
    assert_eq!(selector.processed(), 1);

    let report = selector.terminate().unwrap();
    assert_eq!(report.raw(Stage::Input.name()), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_produced_list_matches_accepted(pattern in prop::collection::vec(any::<bool>(), 1..25)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passing.json");
        let source = VecEventSource::new(
            "random",
            pattern
                .iter()
                .enumerate()
                .map(|(i, &pass)| if pass { passing_event(i as u64) } else { empty_event(i as u64) })
                .collect(),
        );

        let mut selector = Selector::new(config_with_list(&path), weighter()).unwrap();
        let summary = selector.run(&source).unwrap();

        let expected: BTreeSet<u64> = pattern
            .iter()
            .enumerate()
            .filter(|(_, pass)| **pass)
            .map(|(i, _)| i as u64)
            .collect();
        prop_assert_eq!(summary.accepted.iter().copied().collect::<BTreeSet<u64>>(), expected.clone());
        prop_assert_eq!(EventListManager::load(&path).unwrap(), Some(expected.clone()));
        prop_assert_eq!(summary.report.raw(Stage::MllMin.name()), expected.len() as u64);
    }
}
