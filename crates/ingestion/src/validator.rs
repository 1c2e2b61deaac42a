//! Trade schema validation.
//!
//! Trades with a non-positive or non-finite price, a zero size, or a timestamp
//! earlier than the last accepted trade are dropped and counted. A dropped
//! trade never reaches the classifier or the accumulator.

use infobar_core::{Error, TimestampNs, Trade};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Why a trade was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NonPositivePrice,
    NonFinitePrice,
    NonPositiveSize,
    OutOfOrder,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DropReason::NonPositivePrice => "price must be positive",
            DropReason::NonFinitePrice => "price must be finite",
            DropReason::NonPositiveSize => "size must be positive",
            DropReason::OutOfOrder => "timestamp precedes the previous trade",
        };
        f.write_str(msg)
    }
}

/// Dropped-trade counters by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropStats {
    pub non_positive_price: u64,
    pub non_finite_price: u64,
    pub non_positive_size: u64,
    pub out_of_order: u64,
}

impl DropStats {
    /// Total dropped trades.
    pub fn total(&self) -> u64 {
        self.non_positive_price + self.non_finite_price + self.non_positive_size + self.out_of_order
    }

    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::NonPositivePrice => self.non_positive_price += 1,
            DropReason::NonFinitePrice => self.non_finite_price += 1,
            DropReason::NonPositiveSize => self.non_positive_size += 1,
            DropReason::OutOfOrder => self.out_of_order += 1,
        }
    }
}

/// Validates trades of one instrument-day in arrival order.
#[derive(Debug, Clone, Default)]
pub struct TradeValidator {
    /// Timestamp of the last accepted trade.
    last_ts_ns: Option<TimestampNs>,
    /// Index of the next trade seen (accepted or not).
    next_index: u64,
    drops: DropStats,
}

impl TradeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a trade without touching validator state.
    pub fn reason(&self, trade: &Trade) -> Option<DropReason> {
        if !trade.price.is_finite() {
            Some(DropReason::NonFinitePrice)
        } else if trade.price <= 0.0 {
            Some(DropReason::NonPositivePrice)
        } else if trade.size == 0 {
            Some(DropReason::NonPositiveSize)
        } else if self.last_ts_ns.is_some_and(|last| trade.ts_ns < last) {
            Some(DropReason::OutOfOrder)
        } else {
            None
        }
    }

    /// Validate the next trade. Accepted trades advance the ordering watermark;
    /// rejected ones are counted and returned as a `MalformedTrade` error.
    pub fn check(&mut self, trade: Trade) -> Result<Trade, Error> {
        let index = self.next_index;
        self.next_index += 1;

        match self.reason(&trade) {
            None => {
                self.last_ts_ns = Some(trade.ts_ns);
                Ok(trade)
            }
            Some(reason) => {
                debug!(
                    index,
                    ts_ns = trade.ts_ns,
                    price = trade.price,
                    size = trade.size,
                    %reason,
                    "Dropping trade"
                );
                self.drops.record(reason);
                Err(Error::malformed_trade(index, reason.to_string()))
            }
        }
    }

    /// Number of trades seen so far.
    pub fn seen(&self) -> u64 {
        self.next_index
    }

    /// Drop counters.
    pub fn drops(&self) -> &DropStats {
        &self.drops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade(ts_ns: i64, price: f64, size: u64) -> Trade {
        Trade { ts_ns, price, size }
    }

    #[test]
    fn test_accepts_valid_trades() {
        let mut validator = TradeValidator::new();
        assert!(validator.check(make_trade(1, 10.0, 100)).is_ok());
        assert!(validator.check(make_trade(1, 10.1, 100)).is_ok()); // tie is fine
        assert!(validator.check(make_trade(2, 10.2, 1)).is_ok());
        assert_eq!(validator.drops().total(), 0);
        assert_eq!(validator.seen(), 3);
    }

    #[test]
    fn test_drops_bad_price_and_size() {
        let mut validator = TradeValidator::new();
        assert!(validator.check(make_trade(1, 0.0, 100)).is_err());
        assert!(validator.check(make_trade(2, -1.0, 100)).is_err());
        assert!(validator.check(make_trade(3, f64::NAN, 100)).is_err());
        assert!(validator.check(make_trade(4, 10.0, 0)).is_err());

        let drops = validator.drops();
        assert_eq!(drops.non_positive_price, 2);
        assert_eq!(drops.non_finite_price, 1);
        assert_eq!(drops.non_positive_size, 1);
        assert_eq!(drops.total(), 4);
    }

    #[test]
    fn test_out_of_order_against_last_accepted() {
        let mut validator = TradeValidator::new();
        validator.check(make_trade(10, 10.0, 100)).unwrap();
        // Rejected trade must not move the watermark.
        assert!(validator.check(make_trade(20, -1.0, 100)).is_err());
        assert!(validator.check(make_trade(15, 10.0, 100)).is_ok());
        assert!(validator.check(make_trade(5, 10.0, 100)).is_err());
        assert_eq!(validator.drops().out_of_order, 1);
    }

    #[test]
    fn test_error_carries_index() {
        let mut validator = TradeValidator::new();
        validator.check(make_trade(1, 10.0, 100)).unwrap();
        match validator.check(make_trade(2, 10.0, 0)) {
            Err(Error::MalformedTrade { index, reason }) => {
                assert_eq!(index, 1);
                assert_eq!(reason, "size must be positive");
            }
            other => panic!("expected malformed trade, got {other:?}"),
        }
    }
}
