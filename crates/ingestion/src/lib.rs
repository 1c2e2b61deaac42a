//! Data ingestion and normalization for the bar engine.
//!
//! This crate handles:
//! - Trade side inference (tick rule)
//! - Trade schema validation and drop accounting
//! - Pseudo-trade synthesis from minute aggregates
//! - CSV readers for tick and aggregate partitions

pub mod classifier;
pub mod fallback;
pub mod reader;
pub mod validator;

pub use classifier::{tick_rule, ClassificationStats, TickRuleClassifier};
pub use fallback::AggregateFallbackAdapter;
pub use reader::{
    read_minute_aggregates, read_minute_aggregates_from, read_trades, read_trades_from,
};
pub use validator::{DropReason, DropStats, TradeValidator};
