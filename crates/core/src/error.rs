//! Error types for the bar construction engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bar construction engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A trade violated the input schema (price, size or ordering).
    #[error("Malformed trade at index {index}: {reason}")]
    MalformedTrade { index: u64, reason: String },

    /// Neither a tick file nor a usable aggregate file exists for an instrument-day.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Configuration rejected before any instrument-day was processed.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Adaptive threshold collapsed to a non-positive or non-finite value.
    #[error("Degenerate threshold {threshold} after {bars_closed} bars")]
    ThresholdDegenerate { bars_closed: u64, threshold: f64 },

    /// Data error (unreadable or inconsistent data).
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed trade error.
    pub fn malformed_trade(index: u64, reason: impl Into<String>) -> Self {
        Error::MalformedTrade {
            index,
            reason: reason.into(),
        }
    }

    /// Create a missing input error.
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Error::MissingInput(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Short stable name of the error kind, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedTrade { .. } => "malformed_trade",
            Error::MissingInput(_) => "missing_input",
            Error::InvalidConfiguration(_) => "invalid_configuration",
            Error::ThresholdDegenerate { .. } => "threshold_degenerate",
            Error::Data(_) => "data",
            Error::Io(_) => "io",
            Error::Csv(_) => "csv",
            Error::Json(_) => "json",
        }
    }
}
