//! Cutflow accounting
//!
//! An ordered table of selection stages with, for each stage, the number
//! of events that passed it and the sum of their weights.
//!
//! # Critical Invariants
//!
//! - Stage order is registration order and is preserved in the report.
//! - Stages are registered before the first increment; registering later,
//!   registering a name twice, or incrementing an unknown name is an error.
//! - Counts never decrease during a run.
//! - Merging two counters sums stage by stage, so shards can be combined
//!   in any order.

use crate::models::{EventFlags, Stage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors from cutflow bookkeeping (programmer errors)
#[derive(Debug, Error, PartialEq)]
pub enum CutFlowError {
    #[error("Stage '{0}' registered twice")]
    DuplicateStage(String),

    #[error("Cannot register stage '{0}' after counting has started")]
    RegistrationClosed(String),

    #[error("Unknown stage '{0}'")]
    UnknownStage(String),

    #[error("Cannot merge cutflows with different stages: {ours:?} vs {theirs:?}")]
    StageMismatch {
        ours: Vec<String>,
        theirs: Vec<String>,
    },
}

/// How stage decisions turn into counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutFlowMode {
    /// Each stage counted on its own decision
    #[default]
    Independent,
    /// A stage counts only events passing it and every earlier stage
    Sequential,
}

impl CutFlowMode {
    /// Whether an event with `flags` is counted at `stage`
    pub fn counts(&self, flags: &EventFlags, stage: Stage) -> bool {
        match self {
            CutFlowMode::Independent => flags.passes(stage),
            CutFlowMode::Sequential => flags.passes_through(stage),
        }
    }
}

/// Totals for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCount {
    pub name: String,
    /// Number of events counted
    pub raw: u64,
    /// Sum of event weights counted
    pub weighted: f64,
}

/// Ordered per-stage counters
///
/// # Example
///
/// ```
/// use hlfv_selector_core::cutflow::CutFlowCounter;
///
/// let mut counter = CutFlowCounter::new();
/// counter.register_stage("trigger").unwrap();
/// counter.register_stage("two_leptons").unwrap();
///
/// counter.increment("trigger", 0.5).unwrap();
/// counter.increment("trigger", 1.5).unwrap();
///
/// let report = counter.report();
/// assert_eq!(report.rows()[0].raw, 2);
/// assert_eq!(report.rows()[0].weighted, 2.0);
/// assert_eq!(report.rows()[1].raw, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CutFlowCounter {
    stages: Vec<StageCount>,
    index: HashMap<String, usize>,
    counting: bool,
}

impl CutFlowCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter with `names` registered in order
    pub fn with_stages<I, S>(names: I) -> Result<Self, CutFlowError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counter = Self::new();
        for name in names {
            counter.register_stage(name)?;
        }
        Ok(counter)
    }

    /// Append a stage at the end of the cutflow
    pub fn register_stage(&mut self, name: impl Into<String>) -> Result<(), CutFlowError> {
        let name = name.into();
        if self.counting {
            return Err(CutFlowError::RegistrationClosed(name));
        }
        if self.index.contains_key(&name) {
            return Err(CutFlowError::DuplicateStage(name));
        }
        self.index.insert(name.clone(), self.stages.len());
        self.stages.push(StageCount {
            name,
            raw: 0,
            weighted: 0.0,
        });
        Ok(())
    }

    /// Count one event of weight `weight` at `name`
    pub fn increment(&mut self, name: &str, weight: f64) -> Result<(), CutFlowError> {
        let &i = self
            .index
            .get(name)
            .ok_or_else(|| CutFlowError::UnknownStage(name.to_string()))?;
        self.counting = true;
        let stage = &mut self.stages[i];
        stage.raw += 1;
        stage.weighted += weight;
        Ok(())
    }

    /// Whether any increment has happened (registration is closed)
    pub fn is_counting(&self) -> bool {
        self.counting
    }

    pub fn stage(&self, name: &str) -> Option<&StageCount> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// Registered stage names, in order
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name.clone()).collect()
    }

    /// Add another counter's totals into this one
    ///
    /// Both counters must have the same stages in the same order.
    pub fn merge(&mut self, other: &CutFlowCounter) -> Result<(), CutFlowError> {
        let same = self.stages.len() == other.stages.len()
            && self
                .stages
                .iter()
                .zip(&other.stages)
                .all(|(a, b)| a.name == b.name);
        if !same {
            return Err(CutFlowError::StageMismatch {
                ours: self.stage_names(),
                theirs: other.stage_names(),
            });
        }
        for (ours, theirs) in self.stages.iter_mut().zip(&other.stages) {
            ours.raw += theirs.raw;
            ours.weighted += theirs.weighted;
        }
        self.counting |= other.counting;
        Ok(())
    }

    /// Forget every stage and count
    pub fn reset(&mut self) {
        self.stages.clear();
        self.index.clear();
        self.counting = false;
    }

    /// Snapshot of the current totals
    pub fn report(&self) -> CutFlowReport {
        CutFlowReport {
            rows: self.stages.clone(),
        }
    }
}

/// Ordered cutflow table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CutFlowReport {
    rows: Vec<StageCount>,
}

impl CutFlowReport {
    /// Rows in stage order
    pub fn rows(&self) -> &[StageCount] {
        &self.rows
    }

    pub fn get(&self, name: &str) -> Option<&StageCount> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Raw count for `name` (0 if absent)
    pub fn raw(&self, name: &str) -> u64 {
        self.get(name).map(|r| r.raw).unwrap_or(0)
    }

    /// Weighted count for `name` (0.0 if absent)
    pub fn weighted(&self, name: &str) -> f64 {
        self.get(name).map(|r| r.weighted).unwrap_or(0.0)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for CutFlowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.name.len())
            .max()
            .unwrap_or(0)
            .max("stage".len());
        writeln!(f, "{:<width$} {:>12} {:>16}", "stage", "raw", "weighted", width = width)?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<width$} {:>12} {:>16.4}",
                row.name,
                row.raw,
                row.weighted,
                width = width
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut counter = CutFlowCounter::new();
        counter.register_stage("a").unwrap();
        assert_eq!(
            counter.register_stage("a"),
            Err(CutFlowError::DuplicateStage("a".to_string()))
        );
    }

    #[test]
    fn test_registration_closed_after_increment() {
        let mut counter = CutFlowCounter::with_stages(["a"]).unwrap();
        counter.increment("a", 1.0).unwrap();
        assert!(counter.is_counting());
        assert_eq!(
            counter.register_stage("b"),
            Err(CutFlowError::RegistrationClosed("b".to_string()))
        );
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let mut counter = CutFlowCounter::with_stages(["a"]).unwrap();
        assert_eq!(
            counter.increment("b", 1.0),
            Err(CutFlowError::UnknownStage("b".to_string()))
        );
        // A failed increment does not close registration
        assert!(!counter.is_counting());
    }

    #[test]
    fn test_reset_reopens_registration() {
        let mut counter = CutFlowCounter::with_stages(["a"]).unwrap();
        counter.increment("a", 1.0).unwrap();
        counter.reset();
        assert!(counter.stage_names().is_empty());
        counter.register_stage("a").unwrap();
        assert_eq!(counter.stage("a").unwrap().raw, 0);
    }

    #[test]
    fn test_mode_counts() {
        let flags = EventFlags::all_passing().with(Stage::Grl, false);
        assert!(CutFlowMode::Independent.counts(&flags, Stage::Trigger));
        assert!(!CutFlowMode::Sequential.counts(&flags, Stage::Trigger));
        assert!(CutFlowMode::Sequential.counts(&flags, Stage::Input));
    }

    #[test]
    fn test_display_lists_stages_in_order() {
        let mut counter = CutFlowCounter::with_stages(["zeta", "alpha"]).unwrap();
        counter.increment("alpha", 2.0).unwrap();
        let table = counter.report().to_string();
        let zeta = table.find("zeta").unwrap();
        let alpha = table.find("alpha").unwrap();
        assert!(zeta < alpha);
        assert!(table.contains("2.0000"));
    }
}
