//! Batch outcome reporting.

use infobar_bars::RunSummary;
use infobar_core::InstrumentDay;
use serde::{Deserialize, Serialize};

/// Outcome of one instrument-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayOutcome {
    /// Bars and completion marker written.
    Completed(RunSummary),
    /// Not run (no usable input).
    Skipped { reason: String },
    /// Run failed; no completion marker was written.
    Failed { kind: String, message: String },
}

impl DayOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DayOutcome::Completed(_))
    }
}

/// Per instrument-day outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<(InstrumentDay, DayOutcome)>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, DayOutcome::Completed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DayOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DayOutcome::Failed { .. }))
    }

    /// True when nothing failed. Skips don't count against a batch.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    /// Bars written across all completed days.
    pub fn total_bars(&self) -> u64 {
        self.summaries().map(|s| s.bars).sum()
    }

    /// Trades dropped across all completed days.
    pub fn total_dropped(&self) -> u64 {
        self.summaries().map(|s| s.drops.total()).sum()
    }

    /// Outcome for a given day, if it was part of the batch.
    pub fn outcome(&self, day: &InstrumentDay) -> Option<&DayOutcome> {
        self.outcomes.iter().find(|(d, _)| d == day).map(|(_, o)| o)
    }

    fn summaries(&self) -> impl Iterator<Item = &RunSummary> {
        self.outcomes.iter().filter_map(|(_, o)| match o {
            DayOutcome::Completed(s) => Some(s),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&DayOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}
