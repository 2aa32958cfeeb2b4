//! Selector Engine
//!
//! Drives one pass over an event source and keeps the cutflow:
//!
//! ```text
//! begin()            Uninitialized/Finalized/Aborted → Ready
//!   register cutflow stages, reset printer and weighter
//! init(source)       Ready → Ready
//!   1. weighter scans the full, unfiltered source (normalization)
//!   2. event list decides consuming / producing / disabled
//! process(index)     Ready/Running → Running   (increasing indices)
//!   1. skip if consuming and index not listed
//!   2. object selection
//!   3. weight components (pure)
//!   4. event flags (needs step 2)
//!   5. cutflow increments
//!   6. record index if producing and the event passes everything
//!   7. progress printer
//!   8. return pass/fail
//! terminate()        Running/Ready → Finalized
//!   report the cutflow, then save the event list if producing
//! ```
//!
//! Any error during `init` or `process` moves the selector to `Aborted`:
//! the partial counters are not a valid result and `terminate` refuses to
//! report them.
//!
//! # Example
//!
//! ```rust
//! use hlfv_selector_core::models::Event;
//! use hlfv_selector_core::selector::{Selector, SelectorConfig};
//! use hlfv_selector_core::source::VecEventSource;
//! use hlfv_selector_core::weighting::{CrossSectionTable, McWeighter};
//!
//! let source = VecEventSource::new("data", vec![Event::data(1, 1), Event::data(1, 2)]);
//!
//! let weighter = McWeighter::new(CrossSectionTable::new(), 1000.0).unwrap();
//! let mut selector = Selector::new(SelectorConfig::default(), Box::new(weighter)).unwrap();
//! let summary = selector.run(&source).unwrap();
//!
//! assert_eq!(summary.visited, 2);
//! assert_eq!(summary.report.raw("input"), 2);
//! assert!(summary.accepted.is_empty()); // no leptons
//! ```

use crate::core::progress::ProgressPrinter;
use crate::cutflow::{CutFlowCounter, CutFlowError, CutFlowReport};
use crate::eventlist::{EventListError, EventListManager, EventListMode};
use crate::models::{Event, EventFlags, SelectedObjects, Stage, WeightComponents};
use crate::selection::{BaselineObjectSelector, ObjectSelector};
use crate::selector::config::{ConfigError, SelectorConfig};
use crate::source::{EventSource, SourceError};
use crate::trigger::{DileptonTriggerLogic, TriggerLogic};
use crate::weighting::{WeightError, Weighter};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// States, Outcomes, Errors
// ============================================================================

/// Lifecycle state of a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// Constructed, `begin` not yet called
    Uninitialized,
    /// Counters registered; waiting for `init` or the first `process`
    Ready,
    /// At least one entry processed
    Running,
    /// Report produced
    Finalized,
    /// A fatal error occurred; counters are invalid
    Aborted,
}

/// Result of processing one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not in the consumed event list; nothing was evaluated
    Skipped,
    /// Evaluated and failed at least one stage
    Rejected,
    /// Evaluated and passed every stage
    Accepted,
}

impl EventOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EventOutcome::Accepted)
    }
}

/// Summary of a complete `run`
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Entries handed to `process` (including skipped ones)
    pub visited: u64,
    /// Entries that passed every stage, in order
    pub accepted: Vec<u64>,
    pub report: CutFlowReport,
    pub event_list_mode: EventListMode,
}

/// Selector errors
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("{operation} not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SelectorState,
    },

    #[error("No event source attached; call init() before process()")]
    NotInitialized,

    #[error("Source '{attached}' already attached for this run, cannot attach '{offered}'")]
    SourceMismatch { attached: String, offered: String },

    #[error("Entry {index} processed out of order (previous entry was {previous})")]
    OutOfOrder { index: u64, previous: u64 },

    #[error("Run aborted after a fatal error; counters are not valid")]
    RunAborted,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    CutFlow(#[from] CutFlowError),

    #[error(transparent)]
    Weight(#[from] WeightError),

    #[error(transparent)]
    EventList(#[from] EventListError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

// ============================================================================
// Selector
// ============================================================================

/// Event selection driver
///
/// Owns its collaborators (object selection, trigger logic, weighter), the
/// cutflow counter, the progress printer, and the event list. The event
/// source is borrowed for the duration of the run.
pub struct Selector<'s> {
    config: SelectorConfig,
    state: SelectorState,

    object_selector: Box<dyn ObjectSelector>,
    trigger: Box<dyn TriggerLogic>,
    weighter: Box<dyn Weighter>,

    counter: CutFlowCounter,
    printer: ProgressPrinter,
    event_list: EventListManager,

    source: Option<&'s dyn EventSource>,

    /// Candidate objects of the last evaluated entry
    objects: SelectedObjects,

    previous_index: Option<u64>,
    processed: u64,
    accepted: u64,

    report: Option<CutFlowReport>,
}

impl<'s> Selector<'s> {
    /// Create a selector with the baseline object selection and the
    /// dilepton trigger logic
    pub fn new(config: SelectorConfig, weighter: Box<dyn Weighter>) -> Result<Self, SelectorError> {
        config.validate()?;
        let printer = ProgressPrinter::new(config.progress.clone());
        let event_list = EventListManager::new(config.event_list_path().map(PathBuf::from));
        Ok(Self {
            config,
            state: SelectorState::Uninitialized,
            object_selector: Box::new(BaselineObjectSelector::default()),
            trigger: Box::new(DileptonTriggerLogic::default()),
            weighter,
            counter: CutFlowCounter::new(),
            printer,
            event_list,
            source: None,
            objects: SelectedObjects::new(),
            previous_index: None,
            processed: 0,
            accepted: 0,
            report: None,
        })
    }

    /// Builder: replace the object selection
    pub fn with_object_selector(mut self, selector: Box<dyn ObjectSelector>) -> Self {
        self.object_selector = selector;
        self
    }

    /// Builder: replace the trigger logic
    pub fn with_trigger_logic(mut self, trigger: Box<dyn TriggerLogic>) -> Self {
        self.trigger = trigger;
        self
    }

    /// Use an event list at `filename`; an empty name disables the feature
    ///
    /// The path is read by `begin` only, so it can be changed before the
    /// first run or between runs but not while one is in progress.
    pub fn set_event_list_filename(
        &mut self,
        filename: impl Into<PathBuf>,
    ) -> Result<&mut Self, SelectorError> {
        match self.state {
            SelectorState::Uninitialized | SelectorState::Finalized | SelectorState::Aborted => {}
            state => {
                return Err(SelectorError::InvalidState {
                    operation: "set_event_list_filename",
                    state,
                })
            }
        }
        let filename = filename.into();
        self.config.event_list = if filename.as_os_str().is_empty() {
            None
        } else {
            Some(filename)
        };
        Ok(self)
    }

    /// Set the diagnostic verbosity
    pub fn set_debug(&mut self, level: u8) -> &mut Self {
        self.config.debug = level;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn counter(&self) -> &CutFlowCounter {
        &self.counter
    }

    /// Final report, once `terminate` has run
    pub fn report(&self) -> Option<&CutFlowReport> {
        self.report.as_ref()
    }

    /// Mode chosen at `init` (None before)
    pub fn event_list_mode(&self) -> Option<EventListMode> {
        self.event_list.mode()
    }

    pub fn event_list(&self) -> &EventListManager {
        &self.event_list
    }

    /// Candidate objects of the last evaluated entry
    pub fn objects(&self) -> &SelectedObjects {
        &self.objects
    }

    /// Entries evaluated (not skipped) in this run
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Entries accepted in this run
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Prepare a new run
    pub fn begin(&mut self) -> Result<(), SelectorError> {
        match self.state {
            SelectorState::Uninitialized | SelectorState::Finalized | SelectorState::Aborted => {}
            state => {
                return Err(SelectorError::InvalidState {
                    operation: "begin",
                    state,
                })
            }
        }

        self.counter.reset();
        for stage in Stage::ALL {
            self.counter.register_stage(stage.name())?;
        }
        self.printer = ProgressPrinter::new(self.config.progress.clone());
        self.weighter.reset();
        self.event_list = EventListManager::new(self.config.event_list_path().map(PathBuf::from));
        self.source = None;
        self.objects = SelectedObjects::new();
        self.previous_index = None;
        self.processed = 0;
        self.accepted = 0;
        self.report = None;

        self.state = SelectorState::Ready;
        tracing::debug!(stages = Stage::ALL.len(), "selector ready");
        Ok(())
    }

    /// Attach the event source
    ///
    /// The weighter sees the full source before the event list can restrict
    /// anything. Attaching the same source again is a no-op; any other
    /// source is rejected until the next `begin`.
    pub fn init(&mut self, source: &'s dyn EventSource) -> Result<(), SelectorError> {
        if self.state != SelectorState::Ready {
            return Err(SelectorError::InvalidState {
                operation: "init",
                state: self.state,
            });
        }

        if let Some(attached) = self.source {
            if std::ptr::addr_eq(attached, source) {
                tracing::debug!(source = source.name(), "source already attached");
                return Ok(());
            }
            return Err(SelectorError::SourceMismatch {
                attached: attached.name().to_string(),
                offered: source.name().to_string(),
            });
        }

        let result = self.attach(source);
        if let Err(e) = &result {
            tracing::error!(source = source.name(), error = %e, "init failed");
            self.state = SelectorState::Aborted;
        }
        result
    }

    fn attach(&mut self, source: &'s dyn EventSource) -> Result<(), SelectorError> {
        self.weighter.initialize(source)?;
        let mode = self.event_list.initialize(source.entries())?;
        self.source = Some(source);
        tracing::info!(
            source = source.name(),
            entries = source.entries(),
            event_list = ?mode,
            "source attached"
        );
        Ok(())
    }

    /// Indices the owning loop should hand to `process`
    pub fn visit_indices(&self) -> Result<Box<dyn Iterator<Item = u64>>, SelectorError> {
        let source = self.source.ok_or(SelectorError::NotInitialized)?;
        match self.event_list.mode() {
            Some(EventListMode::Consuming) => {
                let listed: Vec<u64> = self.event_list.entries().iter().copied().collect();
                Ok(Box::new(listed.into_iter()))
            }
            _ => Ok(Box::new(0..source.entries())),
        }
    }

    /// Process one entry
    pub fn process(&mut self, index: u64) -> Result<EventOutcome, SelectorError> {
        match self.state {
            SelectorState::Ready | SelectorState::Running => {}
            state => {
                return Err(SelectorError::InvalidState {
                    operation: "process",
                    state,
                })
            }
        }
        let source = self.source.ok_or(SelectorError::NotInitialized)?;

        if index >= source.entries() {
            self.state = SelectorState::Aborted;
            let error = SourceError::IndexOutOfRange {
                index,
                entries: source.entries(),
            };
            tracing::error!(index, error = %error, "entry outside the source");
            return Err(error.into());
        }
        if let Some(previous) = self.previous_index {
            if index <= previous {
                self.state = SelectorState::Aborted;
                return Err(SelectorError::OutOfOrder { index, previous });
            }
        }
        self.previous_index = Some(index);
        self.state = SelectorState::Running;

        if !self.event_list.should_visit(index) {
            if self.config.debug > 1 {
                tracing::trace!(index, "not in event list, skipped");
            }
            return Ok(EventOutcome::Skipped);
        }

        let result = self.evaluate(source, index);
        if let Err(e) = &result {
            tracing::error!(index, error = %e, "fatal error processing entry");
            self.state = SelectorState::Aborted;
        }
        result
    }

    fn evaluate(&mut self, source: &dyn EventSource, index: u64) -> Result<EventOutcome, SelectorError> {
        let event = source.read(index)?;

        self.objects = self.object_selector.select(&event);
        let weights = Self::assign_static_weight_components(&event, self.weighter.as_ref())?;
        let flags = self.compute_event_flags(&event, &self.objects);
        let pass = self.pass_event_criteria(&flags, &weights)?;

        self.processed += 1;
        if pass {
            self.accepted += 1;
            self.event_list.record(index);
        }
        self.printer.advance();

        if self.config.debug > 0 {
            tracing::debug!(
                index,
                run = event.run_number,
                event = event.event_number,
                weight = weights.total(),
                pass,
                first_failure = ?flags.first_failure(),
                "entry evaluated"
            );
        }

        Ok(if pass {
            EventOutcome::Accepted
        } else {
            EventOutcome::Rejected
        })
    }

    /// Decide the event from its flags and increment the cutflow
    ///
    /// Every stage counted under the configured `CutFlowMode` receives one
    /// raw count and the event's total weight. Returns whether the event
    /// passed every stage.
    pub fn pass_event_criteria(
        &mut self,
        flags: &EventFlags,
        weights: &WeightComponents,
    ) -> Result<bool, SelectorError> {
        match self.state {
            SelectorState::Ready | SelectorState::Running => {}
            state => {
                return Err(SelectorError::InvalidState {
                    operation: "pass_event_criteria",
                    state,
                })
            }
        }

        let weight = weights.total();
        let mode = self.config.cutflow_mode;
        for stage in Stage::ALL {
            if mode.counts(flags, stage) {
                self.counter.increment(stage.name(), weight)?;
            }
        }

        if self.config.debug > 1 {
            tracing::trace!(?flags, "stage decisions");
        }
        Ok(flags.passes_all())
    }

    /// Finish the run
    ///
    /// Produces the cutflow report, then saves the event list in producing
    /// mode. A failed save is returned as an error, but the report has
    /// already been logged and stays available through `report()`.
    /// Calling again after finalization returns the same report without
    /// saving again.
    pub fn terminate(&mut self) -> Result<CutFlowReport, SelectorError> {
        match self.state {
            SelectorState::Ready | SelectorState::Running => {}
            SelectorState::Finalized => {
                tracing::debug!("terminate called again, nothing to do");
                return self.report.clone().ok_or(SelectorError::InvalidState {
                    operation: "terminate",
                    state: self.state,
                });
            }
            SelectorState::Aborted => return Err(SelectorError::RunAborted),
            state => {
                return Err(SelectorError::InvalidState {
                    operation: "terminate",
                    state,
                })
            }
        }

        self.printer.finish();
        let report = self.counter.report();
        for row in report.rows() {
            tracing::info!(stage = %row.name, raw = row.raw, weighted = row.weighted, "cutflow");
        }
        tracing::info!(
            processed = self.processed,
            accepted = self.accepted,
            "selection finished"
        );

        self.report = Some(report.clone());
        self.state = SelectorState::Finalized;

        if let Err(e) = self.event_list.persist() {
            tracing::error!(error = %e, "could not save event list");
            return Err(e.into());
        }
        Ok(report)
    }

    /// Full pass: begin, init, process every visited index, terminate
    pub fn run(&mut self, source: &'s dyn EventSource) -> Result<RunSummary, SelectorError> {
        self.begin()?;
        self.init(source)?;

        let mut visited = 0;
        let mut accepted = Vec::new();
        for index in self.visit_indices()? {
            visited += 1;
            if self.process(index)?.is_accepted() {
                accepted.push(index);
            }
        }

        let report = self.terminate()?;
        Ok(RunSummary {
            visited,
            accepted,
            report,
            event_list_mode: self.event_list.mode().unwrap_or(EventListMode::Disabled),
        })
    }

    // ========================================================================
    // Event-level computations
    // ========================================================================

    /// Weight components that depend only on the event record and the
    /// normalization
    ///
    /// Pure: no state is read or written besides the arguments. Collision
    /// data gets the unit weight.
    pub fn assign_static_weight_components(
        event: &Event,
        weighter: &dyn Weighter,
    ) -> Result<WeightComponents, WeightError> {
        let normalization = weighter.normalization(event)?;
        if !event.is_mc() {
            return Ok(WeightComponents::unit());
        }
        Ok(WeightComponents {
            generator: event.generator_weight,
            pileup: event.pileup_weight,
            normalization,
            lepton_sf: event.lepton_sf,
            trigger: event.trigger_sf,
            btag: event.btag_sf,
        })
    }

    /// Stage decisions for `event`
    ///
    /// Several stages look at the candidate objects, so `objects` must come
    /// from the object selection of the same event.
    pub fn compute_event_flags(&self, event: &Event, objects: &SelectedObjects) -> EventFlags {
        let mll_min = self.config.mll_min;
        EventFlags::all_passing()
            .with(Stage::Grl, event.passes_grl)
            .with(Stage::DetectorErrors, !event.lar_error && !event.tile_error)
            .with(Stage::GoodVertex, event.has_good_vertex)
            .with(Stage::BadJetVeto, !event.bad_jet)
            .with(Stage::BadMuonVeto, !event.bad_muon)
            .with(Stage::CosmicMuonVeto, !event.cosmic_muon)
            .with(Stage::TwoBaselineLeptons, objects.baseline_leptons.len() == 2)
            .with(Stage::Trigger, self.trigger.passes(event, &objects.baseline_leptons))
            .with(Stage::TwoSignalLeptons, objects.signal_leptons.len() == 2)
            .with(Stage::OppositeSign, objects.is_opposite_sign())
            .with(Stage::MllMin, objects.mll().map(|m| m > mll_min).unwrap_or(false))
            .with(Stage::TauVeto, objects.n_taus == 0)
    }
}

impl std::fmt::Debug for Selector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("event_list_mode", &self.event_list.mode())
            .field("processed", &self.processed)
            .field("accepted", &self.accepted)
            .finish()
    }
}
