//! Pseudo-trade synthesis from minute aggregates.
//!
//! Used when an instrument-day has no tick file. Each minute bucket becomes
//! exactly one pseudo-trade at the minute close price, carrying the whole
//! minute's volume, stamped at the minute close.
//!
//! Bars built from pseudo-trades only approximate the dollar value of the
//! real tape (every share is priced at the minute close), and imbalance
//! thresholds are coarse since ticks-per-bar is counted in minutes.

use infobar_core::{InputConfig, MinuteAggregate, Trade};

/// Converts minute aggregates into a pseudo-trade stream.
#[derive(Debug, Clone)]
pub struct AggregateFallbackAdapter {
    input: InputConfig,
    /// Minutes skipped because nothing traded.
    empty_minutes: u64,
}

impl AggregateFallbackAdapter {
    pub fn new(input: InputConfig) -> Self {
        Self {
            input,
            empty_minutes: 0,
        }
    }

    /// Pseudo-trade for one minute, or `None` for a zero-volume minute.
    pub fn pseudo_trade(&mut self, minute: &MinuteAggregate) -> Option<Trade> {
        if minute.volume == 0 {
            self.empty_minutes += 1;
            return None;
        }
        Some(Trade {
            ts_ns: self.input.minute_close(minute.ts_ns),
            price: minute.close,
            size: minute.volume,
        })
    }

    /// Pseudo-trades for a whole day of minute aggregates, in input order.
    pub fn synthesize(&mut self, minutes: &[MinuteAggregate]) -> Vec<Trade> {
        minutes.iter().filter_map(|m| self.pseudo_trade(m)).collect()
    }

    pub fn empty_minutes(&self) -> u64 {
        self.empty_minutes
    }
}
