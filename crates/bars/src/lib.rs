//! Information-driven bar construction.
//!
//! This crate handles:
//! - Adaptive threshold estimation (EWMA of ticks per bar and imbalance per tick)
//! - Open-bar accumulation and the DB/VB/DIB/VIB closing predicates
//! - Single-pass per instrument-day runs over ticks or minute aggregates

pub mod accumulator;
pub mod engine;
pub mod threshold;

pub use accumulator::{AccumulatorState, BarAccumulator};
pub use engine::{run_minute_aggregates, run_ticks, BarEngine, RunOutput, RunSummary};
pub use threshold::{ClosingRule, Threshold, ThresholdEstimator, ThresholdState};
