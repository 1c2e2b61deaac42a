//! Trade sign inference using the tick rule.
//!
//! Classifies each trade as buy- or sell-initiated by comparing its price to
//! the previous trade's price. Zero-ticks carry the last known direction.

use infobar_core::{SignedTrade, Trade, TradeSign};
use serde::{Deserialize, Serialize};

/// Tick rule as a pure function of (current price, previous price, last sign).
///
/// `last_sign` is the last non-zero sign seen so far, or `Unsigned` if none.
#[inline]
pub fn tick_rule(price: f64, prev_price: Option<f64>, last_sign: TradeSign) -> TradeSign {
    match prev_price {
        Some(prev) if price > prev => TradeSign::Buy,
        Some(prev) if price < prev => TradeSign::Sell,
        _ => last_sign,
    }
}

/// Statistics about trade classification over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationStats {
    /// Total trades classified.
    pub total_trades: u64,
    /// Trades classified as buy.
    pub buy_trades: u64,
    /// Trades classified as sell.
    pub sell_trades: u64,
    /// Trades left unsigned (no direction known yet).
    pub unsigned_trades: u64,
    /// Buy volume.
    pub buy_volume: u64,
    /// Sell volume.
    pub sell_volume: u64,
    /// Unsigned volume.
    pub unsigned_volume: u64,
}

impl ClassificationStats {
    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stateful tick-rule classifier for one instrument-day.
#[derive(Debug, Clone)]
pub struct TickRuleClassifier {
    /// Last trade price.
    last_trade_price: Option<f64>,
    /// Last non-zero sign (for zero-tick continuation).
    last_sign: TradeSign,
    /// Classification statistics.
    stats: ClassificationStats,
}

impl TickRuleClassifier {
    /// Create a new classifier with no history.
    pub fn new() -> Self {
        Self {
            last_trade_price: None,
            last_sign: TradeSign::Unsigned,
            stats: ClassificationStats::default(),
        }
    }

    /// Classify a single trade and advance the classifier state.
    pub fn classify(&mut self, trade: Trade) -> SignedTrade {
        let sign = tick_rule(trade.price, self.last_trade_price, self.last_sign);

        self.stats.total_trades += 1;
        match sign {
            TradeSign::Buy => {
                self.stats.buy_trades += 1;
                self.stats.buy_volume += trade.size;
            }
            TradeSign::Sell => {
                self.stats.sell_trades += 1;
                self.stats.sell_volume += trade.size;
            }
            TradeSign::Unsigned => {
                self.stats.unsigned_trades += 1;
                self.stats.unsigned_volume += trade.size;
            }
        }

        self.last_trade_price = Some(trade.price);
        if sign.is_directional() {
            self.last_sign = sign;
        }

        SignedTrade { trade, sign }
    }

    /// Classify a batch of trades in order.
    pub fn classify_batch(&mut self, trades: &[Trade]) -> Vec<SignedTrade> {
        trades.iter().map(|t| self.classify(*t)).collect()
    }

    /// Get classification statistics.
    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }

    /// Clear all state (last trade info and statistics).
    pub fn clear(&mut self) {
        self.last_trade_price = None;
        self.last_sign = TradeSign::Unsigned;
        self.stats.reset();
    }
}

impl Default for TickRuleClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade(ts_ns: i64, price: f64, size: u64) -> Trade {
        Trade { ts_ns, price, size }
    }

    #[test]
    fn test_tick_rule_pure() {
        assert_eq!(tick_rule(10.5, Some(10.0), TradeSign::Sell), TradeSign::Buy);
        assert_eq!(tick_rule(9.5, Some(10.0), TradeSign::Buy), TradeSign::Sell);
        assert_eq!(tick_rule(10.0, Some(10.0), TradeSign::Sell), TradeSign::Sell);
        assert_eq!(tick_rule(10.0, None, TradeSign::Unsigned), TradeSign::Unsigned);
    }

    #[test]
    fn test_first_trade_unsigned() {
        let mut classifier = TickRuleClassifier::new();
        let signed = classifier.classify(make_trade(1, 10.0, 100));
        assert_eq!(signed.sign, TradeSign::Unsigned);
    }

    #[test]
    fn test_up_and_down_ticks() {
        let mut classifier = TickRuleClassifier::new();
        classifier.classify(make_trade(1, 10.0, 100));

        let up = classifier.classify(make_trade(2, 10.5, 200));
        assert_eq!(up.sign, TradeSign::Buy);

        let down = classifier.classify(make_trade(3, 10.2, 50));
        assert_eq!(down.sign, TradeSign::Sell);
    }

    #[test]
    fn test_zero_tick_continuation() {
        let mut classifier = TickRuleClassifier::new();
        classifier.classify(make_trade(1, 10.0, 100));
        classifier.classify(make_trade(2, 9.9, 100)); // Sell

        let flat = classifier.classify(make_trade(3, 9.9, 100));
        assert_eq!(flat.sign, TradeSign::Sell);

        let flat_again = classifier.classify(make_trade(4, 9.9, 100));
        assert_eq!(flat_again.sign, TradeSign::Sell);
    }

    #[test]
    fn test_flat_open_stays_unsigned() {
        let mut classifier = TickRuleClassifier::new();
        let signs: Vec<TradeSign> = classifier
            .classify_batch(&[
                make_trade(1, 10.0, 1),
                make_trade(2, 10.0, 1),
                make_trade(3, 10.0, 1),
                make_trade(4, 10.1, 1),
            ])
            .iter()
            .map(|s| s.sign)
            .collect();
        assert_eq!(
            signs,
            vec![
                TradeSign::Unsigned,
                TradeSign::Unsigned,
                TradeSign::Unsigned,
                TradeSign::Buy
            ]
        );
    }

    #[test]
    fn test_stats() {
        let mut classifier = TickRuleClassifier::new();
        classifier.classify(make_trade(1, 10.0, 100)); // Unsigned
        classifier.classify(make_trade(2, 10.5, 200)); // Buy
        classifier.classify(make_trade(3, 10.2, 50)); // Sell

        let stats = classifier.stats();
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.buy_trades, 1);
        assert_eq!(stats.sell_trades, 1);
        assert_eq!(stats.unsigned_trades, 1);
        assert_eq!(stats.buy_volume, 200);
        assert_eq!(stats.sell_volume, 50);
        assert_eq!(stats.unsigned_volume, 100);
    }

    #[test]
    fn test_clear() {
        let mut classifier = TickRuleClassifier::new();
        classifier.classify(make_trade(1, 10.0, 100));
        classifier.classify(make_trade(2, 10.5, 100));
        classifier.clear();

        let signed = classifier.classify(make_trade(3, 11.0, 100));
        assert_eq!(signed.sign, TradeSign::Unsigned);
        assert_eq!(classifier.stats().total_trades, 1);
    }
}
