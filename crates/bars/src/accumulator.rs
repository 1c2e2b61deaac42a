//! Open-bar accumulation and the closing predicate.
//!
//! The accumulator is either empty or holds one open bar. Each signed trade
//! either opens a bar or extends the open one; when the closing predicate
//! holds the bar is emitted and the accumulator is empty again.

use infobar_core::{Bar, BarMode, SignedTrade, TimestampNs};
use tracing::debug;

use crate::threshold::Threshold;

/// Accumulator state between trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    /// No open bar.
    Empty,
    /// A bar is open and receiving trades.
    Accumulating,
}

/// A bar that's currently being built.
#[derive(Debug, Clone)]
struct BarInProgress {
    t_open: TimestampNs,
    t_close: TimestampNs,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    dollar: f64,
    n_ticks: u64,
    /// Cumulative value in the mode's unit (dollars or shares).
    gross: f64,
    imbalance: f64,
    /// Fixed when the bar opens.
    threshold: Threshold,
}

impl BarInProgress {
    fn new(trade: &SignedTrade, threshold: Threshold) -> Self {
        let t = &trade.trade;
        Self {
            t_open: t.ts_ns,
            t_close: t.ts_ns,
            open: t.price,
            high: t.price,
            low: t.price,
            close: t.price,
            volume: 0,
            dollar: 0.0,
            n_ticks: 0,
            gross: 0.0,
            imbalance: 0.0,
            threshold,
        }
    }

    fn add_trade(&mut self, trade: &SignedTrade, mode: BarMode) {
        let t = &trade.trade;
        self.t_close = t.ts_ns;
        self.high = self.high.max(t.price);
        self.low = self.low.min(t.price);
        self.close = t.price;
        self.volume += t.size;
        self.dollar += t.dollar();
        self.n_ticks += 1;
        self.gross += mode.trade_value(t);
        if mode.is_imbalance() {
            self.imbalance += mode.signed_value(trade);
        }
    }

    fn should_close(&self) -> bool {
        match self.threshold {
            Threshold::Gross(level) => self.gross >= level,
            Threshold::Imbalance(level) => self.imbalance.abs() >= level,
        }
    }

    fn to_bar(&self) -> Bar {
        Bar {
            t_open: self.t_open,
            t_close: self.t_close,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            dollar: self.dollar,
            n_ticks: self.n_ticks,
            imbalance_score: self.imbalance,
        }
    }
}

/// Streaming bar accumulator for one instrument-day.
#[derive(Debug, Clone)]
pub struct BarAccumulator {
    mode: BarMode,
    current: Option<BarInProgress>,
}

impl BarAccumulator {
    pub fn new(mode: BarMode) -> Self {
        Self {
            mode,
            current: None,
        }
    }

    pub fn state(&self) -> AccumulatorState {
        if self.current.is_some() {
            AccumulatorState::Accumulating
        } else {
            AccumulatorState::Empty
        }
    }

    /// Add a signed trade. Returns the bar if this trade closed it.
    ///
    /// `threshold` is only read when the trade opens a new bar; an open bar
    /// keeps the threshold it opened with.
    pub fn push(&mut self, trade: &SignedTrade, threshold: Threshold) -> Option<Bar> {
        let mode = self.mode;
        let bar = self
            .current
            .get_or_insert_with(|| BarInProgress::new(trade, threshold));
        bar.add_trade(trade, mode);

        if !bar.should_close() {
            return None;
        }

        let closed = bar.to_bar();
        self.current = None;
        debug!(
            mode = %mode,
            t_open = closed.t_open,
            t_close = closed.t_close,
            n_ticks = closed.n_ticks,
            volume = closed.volume,
            imbalance = closed.imbalance_score,
            "Bar closed"
        );
        Some(closed)
    }

    /// Ticks in the open bar, if any.
    pub fn open_ticks(&self) -> u64 {
        self.current.as_ref().map_or(0, |b| b.n_ticks)
    }

    /// Discard the open bar at end of stream. Returns how many ticks it held.
    ///
    /// A trailing partial bar is never emitted.
    pub fn discard(&mut self) -> u64 {
        self.current.take().map_or(0, |b| b.n_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infobar_core::{Trade, TradeSign};

    fn make_signed(ts_ns: i64, price: f64, size: u64, sign: TradeSign) -> SignedTrade {
        SignedTrade {
            trade: Trade { ts_ns, price, size },
            sign,
        }
    }

    #[test]
    fn test_open_then_accumulate() {
        let mut acc = BarAccumulator::new(BarMode::Volume);
        assert_eq!(acc.state(), AccumulatorState::Empty);

        let first = make_signed(1, 10.0, 100, TradeSign::Unsigned);
        let out = acc.push(&first, Threshold::Gross(300.0));
        assert!(out.is_none());
        assert_eq!(acc.state(), AccumulatorState::Accumulating);
        assert_eq!(acc.open_ticks(), 1);
    }

    #[test]
    fn test_ohlc_and_sums() {
        let mut acc = BarAccumulator::new(BarMode::Dollar);
        let th = Threshold::Gross(10_000.0);
        acc.push(&make_signed(1, 10.0, 100, TradeSign::Unsigned), th);
        acc.push(&make_signed(2, 12.0, 100, TradeSign::Buy), th);
        acc.push(&make_signed(3, 9.0, 100, TradeSign::Sell), th);
        let bar = acc.push(&make_signed(4, 11.0, 700, TradeSign::Buy), th).unwrap();

        assert_eq!(bar.t_open, 1);
        assert_eq!(bar.t_close, 4);
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.high, 12.0);
        assert_eq!(bar.low, 9.0);
        assert_eq!(bar.close, 11.0);
        assert_eq!(bar.volume, 1000);
        assert!((bar.dollar - (1000.0 + 1200.0 + 900.0 + 7700.0)).abs() < 1e-9);
        assert_eq!(bar.n_ticks, 4);
        // Non-imbalance modes report zero imbalance.
        assert_eq!(bar.imbalance_score, 0.0);
        assert_eq!(acc.state(), AccumulatorState::Empty);
    }

    #[test]
    fn test_single_oversized_trade_forms_bar() {
        let mut acc = BarAccumulator::new(BarMode::Volume);
        let bar = acc
            .push(&make_signed(1, 10.0, 5_000, TradeSign::Unsigned), Threshold::Gross(300.0))
            .unwrap();
        assert_eq!(bar.n_ticks, 1);
        assert_eq!(bar.t_open, bar.t_close);
        assert_eq!(bar.volume, 5_000);
    }

    #[test]
    fn test_imbalance_closing() {
        let mut acc = BarAccumulator::new(BarMode::VolumeImbalance);
        let th = Threshold::Imbalance(25.0);
        assert!(acc.push(&make_signed(1, 10.0, 10, TradeSign::Unsigned), th).is_none());
        assert!(acc.push(&make_signed(2, 10.1, 20, TradeSign::Buy), th).is_none());
        assert!(acc.push(&make_signed(3, 10.0, 10, TradeSign::Sell), th).is_none());
        let bar = acc.push(&make_signed(4, 10.2, 15, TradeSign::Buy), th).unwrap();
        assert!((bar.imbalance_score - 25.0).abs() < 1e-10);
        assert_eq!(bar.volume, 55);
    }

    #[test]
    fn test_negative_imbalance_closes() {
        let mut acc = BarAccumulator::new(BarMode::DollarImbalance);
        let th = Threshold::Imbalance(150.0);
        assert!(acc.push(&make_signed(1, 10.0, 10, TradeSign::Sell), th).is_none());
        let bar = acc.push(&make_signed(2, 9.0, 10, TradeSign::Sell), th).unwrap();
        assert!((bar.imbalance_score + 190.0).abs() < 1e-10);
    }

    #[test]
    fn test_threshold_fixed_at_open() {
        let mut acc = BarAccumulator::new(BarMode::Volume);
        let trade = |ts| make_signed(ts, 10.0, 100, TradeSign::Unsigned);
        assert!(acc.push(&trade(1), Threshold::Gross(300.0)).is_none());
        // A lower threshold offered mid-bar must not close it early.
        assert!(acc.push(&trade(2), Threshold::Gross(50.0)).is_none());
        assert!(acc.push(&trade(3), Threshold::Gross(50.0)).is_some());
    }

    #[test]
    fn test_discard_trailing_bar() {
        let mut acc = BarAccumulator::new(BarMode::Volume);
        acc.push(&make_signed(1, 10.0, 100, TradeSign::Unsigned), Threshold::Gross(300.0));
        acc.push(&make_signed(2, 10.0, 100, TradeSign::Unsigned), Threshold::Gross(300.0));
        assert_eq!(acc.discard(), 2);
        assert_eq!(acc.state(), AccumulatorState::Empty);
        assert_eq!(acc.discard(), 0);
    }
}
