//! Batch processing over partitioned instrument-day data.
//!
//! This crate handles:
//! - Input/output partition layout and instrument-day discovery
//! - Bar stream persistence with completion markers
//! - Parallel per instrument-day runs with isolated failures

pub mod driver;
pub mod layout;
pub mod report;
pub mod writer;

pub use driver::BatchDriver;
pub use layout::{InputSource, PartitionLayout};
pub use report::{BatchReport, DayOutcome};
pub use writer::{read_bars, read_marker, BarStreamWriter, CompletionMarker, BAR_COLUMNS};
