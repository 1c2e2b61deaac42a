//! Configuration structures for the bar construction engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{BarMode, TimestampNs, NANOS_PER_MINUTE};

/// Main configuration, passed explicitly into every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bar closing policy.
    pub bars: BarConfig,
    /// Input decoding.
    pub input: InputConfig,
    /// Input/output partition layout.
    pub layout: LayoutConfig,
    /// Batch fan-out.
    pub batch: BatchConfig,
}

impl Config {
    /// Parse a configuration from a JSON document. Missing sections take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("unparseable configuration: {e}")))?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check every section. Must pass before any instrument-day is processed.
    pub fn validate(&self) -> Result<()> {
        self.bars.validate()?;
        self.layout.validate()?;
        Ok(())
    }
}

/// How imbalance modes pick their threshold before enough bars exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bootstrap {
    /// Close warmup bars when |imbalance| >= target (target is the seed expected imbalance).
    #[default]
    Seed,
    /// Close warmup bars like dollar/volume bars: cumulative value >= target.
    FixedTarget,
}

/// Bar closing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Closing policy.
    pub mode: BarMode,
    /// Fixed threshold for DB/VB, seed for DIB/VIB (in the mode's unit).
    pub target: f64,
    /// EWMA decay for the threshold estimator.
    pub alpha: f64,
    /// Warmup rule for imbalance modes.
    pub bootstrap: Bootstrap,
    /// Bars closed under the bootstrap rule before the adaptive threshold applies.
    pub warmup_bars: u32,
    /// Synthesize pseudo-trades from minute aggregates when ticks are missing.
    pub fallback_enabled: bool,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            mode: BarMode::Dollar,
            target: 1_000_000.0,
            alpha: 0.1,
            bootstrap: Bootstrap::Seed,
            warmup_bars: 1,
            fallback_enabled: true,
        }
    }
}

impl BarConfig {
    /// Convenience constructor with defaults for everything but mode and target.
    pub fn new(mode: BarMode, target: f64) -> Self {
        Self {
            mode,
            target,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.target.is_finite() || self.target <= 0.0 {
            return Err(Error::config(format!(
                "target must be positive and finite, got {}",
                self.target
            )));
        }
        if !self.alpha.is_finite() || self.alpha <= 0.0 || self.alpha > 1.0 {
            return Err(Error::config(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if self.warmup_bars == 0 {
            return Err(Error::config("warmup_bars must be at least 1"));
        }
        Ok(())
    }
}

/// Resolution of raw input timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    Millis,
    Micros,
    #[default]
    Nanos,
}

impl TimestampUnit {
    /// Convert a raw timestamp in this unit to nanoseconds.
    #[inline]
    pub fn to_nanos(self, raw: i64) -> TimestampNs {
        match self {
            TimestampUnit::Millis => raw.saturating_mul(1_000_000),
            TimestampUnit::Micros => raw.saturating_mul(1_000),
            TimestampUnit::Nanos => raw,
        }
    }
}

/// Input decoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Unit of the `timestamp` column in tick and aggregate files.
    pub timestamp_unit: TimestampUnit,
    /// Minute aggregates carry the minute open time (true) or close time (false).
    pub aggregate_stamped_at_open: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            timestamp_unit: TimestampUnit::Nanos,
            aggregate_stamped_at_open: true,
        }
    }
}

impl InputConfig {
    /// Close time of a minute aggregate, given its raw (already normalized) stamp.
    #[inline]
    pub fn minute_close(&self, ts_ns: TimestampNs) -> TimestampNs {
        if self.aggregate_stamped_at_open {
            ts_ns.saturating_add(NANOS_PER_MINUTE)
        } else {
            ts_ns
        }
    }
}

/// Partition layout for inputs and outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Root of the input partitions.
    pub input_root: PathBuf,
    /// Root of the output partitions.
    pub output_root: PathBuf,
    /// Tick file directory under the input root.
    pub trades_dir: String,
    /// Minute aggregate directory under the input root.
    pub aggregates_dir: String,
    /// Bar file name inside each output partition.
    pub bars_file_name: String,
    /// Completion marker file name inside each output partition.
    pub marker_file_name: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("data/raw"),
            output_root: PathBuf::from("data/bars"),
            trades_dir: "trades".to_string(),
            aggregates_dir: "minute".to_string(),
            bars_file_name: "bars.csv".to_string(),
            marker_file_name: "_SUCCESS".to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("trades_dir", &self.trades_dir),
            ("aggregates_dir", &self.aggregates_dir),
            ("bars_file_name", &self.bars_file_name),
            ("marker_file_name", &self.marker_file_name),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{name} must not be empty")));
            }
        }
        if self.bars_file_name == self.marker_file_name {
            return Err(Error::config("bars_file_name and marker_file_name must differ"));
        }
        Ok(())
    }
}

/// Batch fan-out configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of parallel workers (0 = auto).
    pub workers: usize,
}
