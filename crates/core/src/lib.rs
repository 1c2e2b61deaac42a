//! Core types and configuration for the information-driven bar engine.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (trades, minute aggregates, bars)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{BarConfig, Bootstrap, Config, InputConfig, LayoutConfig, TimestampUnit};
pub use error::{Error, Result};
pub use types::*;
