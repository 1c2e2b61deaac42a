//! Partition layout for input and output files.
//!
//! ```text
//! {input_root}/{trades_dir}/{SYMBOL}/{YYYY-MM-DD}.csv
//! {input_root}/{aggregates_dir}/{SYMBOL}/{YYYY-MM-DD}.csv
//! {output_root}/{MODE}/{SYMBOL}/{YYYY-MM-DD}/{bars_file_name}
//! {output_root}/{MODE}/{SYMBOL}/{YYYY-MM-DD}/{marker_file_name}
//! ```

use chrono::NaiveDate;
use infobar_core::{BarMode, Error, InstrumentDay, LayoutConfig, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Where an instrument-day's input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Ticks(PathBuf),
    MinuteAggregates(PathBuf),
}

/// Resolves partition paths from the layout configuration.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    config: LayoutConfig,
}

impl PartitionLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    fn input_file(&self, dir: &str, day: &InstrumentDay) -> PathBuf {
        self.config
            .input_root
            .join(dir)
            .join(&day.symbol)
            .join(format!("{}.csv", day.date.format(DATE_FORMAT)))
    }

    /// Tick file for a day.
    pub fn trades_path(&self, day: &InstrumentDay) -> PathBuf {
        self.input_file(&self.config.trades_dir, day)
    }

    /// Minute-aggregate file for a day.
    pub fn aggregates_path(&self, day: &InstrumentDay) -> PathBuf {
        self.input_file(&self.config.aggregates_dir, day)
    }

    /// Output partition directory for a day.
    pub fn output_dir(&self, mode: BarMode, day: &InstrumentDay) -> PathBuf {
        self.config
            .output_root
            .join(mode.code())
            .join(&day.symbol)
            .join(day.date.format(DATE_FORMAT).to_string())
    }

    pub fn bars_path(&self, mode: BarMode, day: &InstrumentDay) -> PathBuf {
        self.output_dir(mode, day).join(&self.config.bars_file_name)
    }

    pub fn marker_path(&self, mode: BarMode, day: &InstrumentDay) -> PathBuf {
        self.output_dir(mode, day).join(&self.config.marker_file_name)
    }

    /// Pick the input for a day: ticks when present, else minute aggregates
    /// if fallback is enabled. Never mixes the two.
    pub fn resolve_input(
        &self,
        day: &InstrumentDay,
        fallback_enabled: bool,
    ) -> Result<InputSource> {
        let ticks = self.trades_path(day);
        if ticks.is_file() {
            return Ok(InputSource::Ticks(ticks));
        }
        let minutes = self.aggregates_path(day);
        if fallback_enabled && minutes.is_file() {
            return Ok(InputSource::MinuteAggregates(minutes));
        }
        Err(Error::missing_input(format!(
            "{day}: no tick file at {}{}",
            ticks.display(),
            if fallback_enabled { " and no minute aggregates" } else { " (fallback disabled)" }
        )))
    }

    /// List every instrument-day with a tick or aggregate file, sorted.
    pub fn discover(&self) -> Result<Vec<InstrumentDay>> {
        let mut days = BTreeSet::new();
        for dir in [&self.config.trades_dir, &self.config.aggregates_dir] {
            collect_days(&self.config.input_root.join(dir), &mut days)?;
        }
        Ok(days.into_iter().collect())
    }
}

fn collect_days(root: &Path, days: &mut BTreeSet<InstrumentDay>) -> Result<()> {
    if !root.is_dir() {
        return Ok(());
    }
    for symbol_entry in fs::read_dir(root)? {
        let symbol_dir = symbol_entry?.path();
        if !symbol_dir.is_dir() {
            continue;
        }
        let Some(symbol) = symbol_dir.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        for file_entry in fs::read_dir(&symbol_dir)? {
            let path = file_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let date = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok());
            if let Some(date) = date {
                days.insert(InstrumentDay::new(symbol, date));
            }
        }
    }
    Ok(())
}
