//! CSV readers for tick and minute-aggregate partitions.
//!
//! Raw timestamps are normalized to nanoseconds on read. Negative sizes are
//! mapped to zero so the validator drops them with the other non-positive sizes.

use csv::{ReaderBuilder, Trim};
use infobar_core::{MinuteAggregate, Result, TimestampUnit, Trade};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Tick file row: `timestamp,price,size`.
#[derive(Debug, Deserialize)]
struct TradeRecord {
    timestamp: i64,
    price: f64,
    size: i64,
}

impl TradeRecord {
    fn into_trade(self, unit: TimestampUnit) -> Trade {
        Trade {
            ts_ns: unit.to_nanos(self.timestamp),
            price: self.price,
            size: u64::try_from(self.size).unwrap_or(0),
        }
    }
}

/// Aggregate file row: `timestamp,open,high,low,close,volume`.
#[derive(Debug, Deserialize)]
struct AggregateRecord {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

impl AggregateRecord {
    fn into_aggregate(self, unit: TimestampUnit) -> MinuteAggregate {
        MinuteAggregate {
            ts_ns: unit.to_nanos(self.timestamp),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: u64::try_from(self.volume).unwrap_or(0),
        }
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader)
}

/// Read trades from any CSV source, preserving input order.
pub fn read_trades_from<R: Read>(reader: R, unit: TimestampUnit) -> Result<Vec<Trade>> {
    let mut rdr = csv_reader(reader);
    let mut trades = Vec::new();
    for record in rdr.deserialize::<TradeRecord>() {
        trades.push(record?.into_trade(unit));
    }
    Ok(trades)
}

/// Read a tick file.
pub fn read_trades(path: &Path, unit: TimestampUnit) -> Result<Vec<Trade>> {
    read_trades_from(File::open(path)?, unit)
}

/// Read minute aggregates from any CSV source, preserving input order.
pub fn read_minute_aggregates_from<R: Read>(
    reader: R,
    unit: TimestampUnit,
) -> Result<Vec<MinuteAggregate>> {
    let mut rdr = csv_reader(reader);
    let mut minutes = Vec::new();
    for record in rdr.deserialize::<AggregateRecord>() {
        minutes.push(record?.into_aggregate(unit));
    }
    Ok(minutes)
}

/// Read a minute-aggregate file.
pub fn read_minute_aggregates(path: &Path, unit: TimestampUnit) -> Result<Vec<MinuteAggregate>> {
    read_minute_aggregates_from(File::open(path)?, unit)
}
