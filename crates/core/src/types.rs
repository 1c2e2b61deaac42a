//! Core data types for the bar construction engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Timestamp in nanoseconds since Unix epoch (UTC).
pub type TimestampNs = i64;

/// Nanoseconds in one minute.
pub const NANOS_PER_MINUTE: i64 = 60_000_000_000;

/// A single trade (print).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Timestamp in nanoseconds.
    pub ts_ns: TimestampNs,
    /// Trade price.
    pub price: f64,
    /// Trade size in shares.
    pub size: u64,
}

impl Trade {
    /// Traded dollar value (price * size).
    #[inline]
    pub fn dollar(&self) -> f64 {
        self.price * self.size as f64
    }
}

/// Direction inferred by the tick rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum TradeSign {
    /// Uptick, or zero-tick continuing an uptick.
    Buy = 1,
    /// Downtick, or zero-tick continuing a downtick.
    Sell = -1,
    /// No direction known yet (start of day, flat prices so far).
    Unsigned = 0,
}

impl TradeSign {
    /// Get the sign as i8.
    #[inline]
    pub fn sign(self) -> i8 {
        self as i8
    }

    /// Get the sign as f64.
    #[inline]
    pub fn sign_f64(self) -> f64 {
        self.sign() as f64
    }

    #[inline]
    pub fn is_directional(self) -> bool {
        self != TradeSign::Unsigned
    }
}

/// A trade annotated with its tick-rule sign. Transient, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignedTrade {
    pub trade: Trade,
    pub sign: TradeSign,
}

impl SignedTrade {
    /// Signed share volume (zero for unsigned trades).
    #[inline]
    pub fn signed_volume(&self) -> f64 {
        self.trade.size as f64 * self.sign.sign_f64()
    }

    /// Signed dollar value (zero for unsigned trades).
    #[inline]
    pub fn signed_dollar(&self) -> f64 {
        self.trade.dollar() * self.sign.sign_f64()
    }
}

/// One-minute OHLCV aggregate, used when tick data is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinuteAggregate {
    /// Minute timestamp in nanoseconds (open or close of the minute, see input config).
    pub ts_ns: TimestampNs,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Shares traded during the minute.
    pub volume: u64,
}

/// Bar closing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarMode {
    /// Dollar bars: close on cumulative dollar value.
    #[serde(rename = "DB")]
    Dollar,
    /// Volume bars: close on cumulative share volume.
    #[serde(rename = "VB")]
    Volume,
    /// Dollar imbalance bars: close on signed dollar imbalance.
    #[serde(rename = "DIB")]
    DollarImbalance,
    /// Volume imbalance bars: close on signed volume imbalance.
    #[serde(rename = "VIB")]
    VolumeImbalance,
}

impl BarMode {
    /// Short code used in configuration and output paths.
    pub fn code(self) -> &'static str {
        match self {
            BarMode::Dollar => "DB",
            BarMode::Volume => "VB",
            BarMode::DollarImbalance => "DIB",
            BarMode::VolumeImbalance => "VIB",
        }
    }

    /// Does this mode close on a directional imbalance?
    pub fn is_imbalance(self) -> bool {
        matches!(self, BarMode::DollarImbalance | BarMode::VolumeImbalance)
    }

    /// Does this mode measure activity in dollars (vs. shares)?
    pub fn is_dollar(self) -> bool {
        matches!(self, BarMode::Dollar | BarMode::DollarImbalance)
    }

    /// Unsigned contribution of a trade in this mode's unit.
    #[inline]
    pub fn trade_value(self, trade: &Trade) -> f64 {
        if self.is_dollar() {
            trade.dollar()
        } else {
            trade.size as f64
        }
    }

    /// Signed contribution of a trade in this mode's unit.
    #[inline]
    pub fn signed_value(self, trade: &SignedTrade) -> f64 {
        if self.is_dollar() {
            trade.signed_dollar()
        } else {
            trade.signed_volume()
        }
    }
}

impl fmt::Display for BarMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BarMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "db" | "dollar" => Ok(BarMode::Dollar),
            "vb" | "volume" => Ok(BarMode::Volume),
            "dib" | "dollar_imbalance" => Ok(BarMode::DollarImbalance),
            "vib" | "volume_imbalance" => Ok(BarMode::VolumeImbalance),
            other => Err(Error::config(format!("unknown bar mode '{other}'"))),
        }
    }
}

/// A closed information-driven bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Timestamp of the first trade (ns).
    pub t_open: TimestampNs,
    /// Timestamp of the last trade (ns).
    pub t_close: TimestampNs,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Sum of trade sizes.
    pub volume: u64,
    /// Sum of price * size.
    pub dollar: f64,
    /// Number of trades in the bar.
    pub n_ticks: u64,
    /// Signed net imbalance accumulated (imbalance modes only, 0 otherwise).
    pub imbalance_score: f64,
}

impl Bar {
    /// Volume-weighted average price.
    #[inline]
    pub fn vwap(&self) -> Option<f64> {
        if self.volume > 0 {
            Some(self.dollar / self.volume as f64)
        } else {
            None
        }
    }

    /// Bar duration in nanoseconds.
    #[inline]
    pub fn duration_ns(&self) -> i64 {
        self.t_close - self.t_open
    }
}

/// Which input fed a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// True tick data.
    Ticks,
    /// Pseudo-trades synthesized from minute aggregates.
    MinuteAggregates,
}

/// Unit of work: one instrument on one trading day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentDay {
    pub symbol: String,
    pub date: NaiveDate,
}

impl InstrumentDay {
    pub fn new(symbol: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            date,
        }
    }
}

impl fmt::Display for InstrumentDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbol, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_signed(price: f64, size: u64, sign: TradeSign) -> SignedTrade {
        SignedTrade {
            trade: Trade {
                ts_ns: 0,
                price,
                size,
            },
            sign,
        }
    }

    #[test]
    fn test_trade_sign() {
        assert_eq!(TradeSign::Buy.sign(), 1);
        assert_eq!(TradeSign::Sell.sign(), -1);
        assert_eq!(TradeSign::Unsigned.sign(), 0);
        assert!(!TradeSign::Unsigned.is_directional());
    }

    #[test]
    fn test_signed_values() {
        let buy = make_signed(10.5, 200, TradeSign::Buy);
        assert!((buy.signed_dollar() - 2100.0).abs() < 1e-10);
        assert!((buy.signed_volume() - 200.0).abs() < 1e-10);

        let sell = make_signed(10.0, 50, TradeSign::Sell);
        assert!((sell.signed_volume() + 50.0).abs() < 1e-10);

        let unsigned = make_signed(10.0, 50, TradeSign::Unsigned);
        assert_eq!(unsigned.signed_dollar(), 0.0);
    }

    #[test]
    fn test_mode_units() {
        let trade = Trade {
            ts_ns: 0,
            price: 20.0,
            size: 3,
        };
        assert!((BarMode::Dollar.trade_value(&trade) - 60.0).abs() < 1e-10);
        assert!((BarMode::VolumeImbalance.trade_value(&trade) - 3.0).abs() < 1e-10);
        assert!(BarMode::DollarImbalance.is_imbalance());
        assert!(!BarMode::Volume.is_imbalance());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("dib".parse::<BarMode>().unwrap(), BarMode::DollarImbalance);
        assert_eq!(" VB ".parse::<BarMode>().unwrap(), BarMode::Volume);
        assert_eq!("volume_imbalance".parse::<BarMode>().unwrap(), BarMode::VolumeImbalance);
        assert!("tick".parse::<BarMode>().is_err());
    }

    #[test]
    fn test_mode_serde_codes() {
        let json = serde_json::to_string(&BarMode::VolumeImbalance).unwrap();
        assert_eq!(json, "\"VIB\"");
        let mode: BarMode = serde_json::from_str("\"DB\"").unwrap();
        assert_eq!(mode, BarMode::Dollar);
    }

    #[test]
    fn test_bar_vwap() {
        let bar = Bar {
            t_open: 1,
            t_close: 2,
            open: 10.0,
            high: 10.5,
            low: 10.0,
            close: 10.5,
            volume: 300,
            dollar: 100.0 * 10.0 + 200.0 * 10.5,
            n_ticks: 2,
            imbalance_score: 0.0,
        };
        assert!((bar.vwap().unwrap() - 3100.0 / 300.0).abs() < 1e-10);
        assert_eq!(bar.duration_ns(), 1);
    }

    #[test]
    fn test_instrument_day_display() {
        let day = InstrumentDay::new("AAPL", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(day.to_string(), "AAPL 2024-01-02");
    }
}
