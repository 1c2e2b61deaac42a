//! Adaptive bar-size estimation.
//!
//! Keeps exponentially weighted estimates of ticks per bar, value per tick and
//! signed imbalance per tick. The estimates change only when a bar closes, so
//! a bar is always judged against the threshold that existed when it opened.

use infobar_core::{Bar, BarConfig, BarMode, Bootstrap, Error, Result};
use serde::{Deserialize, Serialize};

#[inline]
fn blend(alpha: f64, old: Option<f64>, observed: f64) -> f64 {
    match old {
        Some(old) => alpha * observed + (1.0 - alpha) * old,
        None => observed,
    }
}

/// Snapshot of the estimator, reported in run summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdState {
    pub ewma_ticks_per_bar: Option<f64>,
    pub ewma_value_per_tick: Option<f64>,
    pub ewma_imbalance_per_tick: Option<f64>,
    pub alpha: f64,
    pub bars_observed: u64,
}

/// EWMA estimator of expected bar size. Owned by exactly one run.
#[derive(Debug, Clone)]
pub struct ThresholdEstimator {
    alpha: f64,
    ewma_ticks_per_bar: Option<f64>,
    ewma_value_per_tick: Option<f64>,
    ewma_imbalance_per_tick: Option<f64>,
    bars_observed: u64,
}

impl ThresholdEstimator {
    /// Create an estimator with no history. The first observation seeds every EWMA.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            ewma_ticks_per_bar: None,
            ewma_value_per_tick: None,
            ewma_imbalance_per_tick: None,
            bars_observed: 0,
        }
    }

    /// Fold one closed bar into the estimates:
    /// `estimate_new = alpha * observed + (1 - alpha) * estimate_old`.
    pub fn update(
        &mut self,
        realized_ticks: u64,
        realized_value_per_tick: f64,
        realized_imbalance_per_tick: f64,
    ) {
        self.ewma_ticks_per_bar = Some(blend(
            self.alpha,
            self.ewma_ticks_per_bar,
            realized_ticks as f64,
        ));
        self.ewma_value_per_tick = Some(blend(
            self.alpha,
            self.ewma_value_per_tick,
            realized_value_per_tick,
        ));
        self.ewma_imbalance_per_tick = Some(blend(
            self.alpha,
            self.ewma_imbalance_per_tick,
            realized_imbalance_per_tick,
        ));
        self.bars_observed += 1;
    }

    /// Fold a closed bar, measuring value in the mode's unit.
    pub fn update_from_bar(&mut self, bar: &Bar, mode: BarMode) {
        if bar.n_ticks == 0 {
            return;
        }
        let n = bar.n_ticks as f64;
        let value = if mode.is_dollar() {
            bar.dollar
        } else {
            bar.volume as f64
        };
        self.update(bar.n_ticks, value / n, bar.imbalance_score / n);
    }

    /// Expected ticks per bar.
    pub fn expected_ticks_per_bar(&self) -> Option<f64> {
        self.ewma_ticks_per_bar
    }

    /// Expected unsigned bar size: ticks per bar * value per tick.
    pub fn expected_bar_value(&self) -> Option<f64> {
        Some(self.ewma_ticks_per_bar? * self.ewma_value_per_tick?)
    }

    /// Expected absolute imbalance: ticks per bar * |imbalance per tick|.
    pub fn expected_imbalance(&self) -> Option<f64> {
        Some(self.ewma_ticks_per_bar? * self.ewma_imbalance_per_tick?.abs())
    }

    pub fn bars_observed(&self) -> u64 {
        self.bars_observed
    }

    pub fn state(&self) -> ThresholdState {
        ThresholdState {
            ewma_ticks_per_bar: self.ewma_ticks_per_bar,
            ewma_value_per_tick: self.ewma_value_per_tick,
            ewma_imbalance_per_tick: self.ewma_imbalance_per_tick,
            alpha: self.alpha,
            bars_observed: self.bars_observed,
        }
    }
}

/// Closing comparison applied to an open bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Close when cumulative value (dollars or shares) reaches the level.
    Gross(f64),
    /// Close when |signed imbalance| reaches the level.
    Imbalance(f64),
}

impl Threshold {
    pub fn value(self) -> f64 {
        match self {
            Threshold::Gross(v) | Threshold::Imbalance(v) => v,
        }
    }
}

/// Where a mode gets its threshold from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClosingRule {
    /// Dollar and volume bars: a constant target.
    Fixed { target: f64 },
    /// Imbalance bars: bootstrap rule for the warmup bars, then the EWMA estimate.
    Adaptive {
        seed: f64,
        bootstrap: Bootstrap,
        warmup_bars: u32,
    },
}

impl ClosingRule {
    pub fn from_config(config: &BarConfig) -> Self {
        if config.mode.is_imbalance() {
            ClosingRule::Adaptive {
                seed: config.target,
                bootstrap: config.bootstrap,
                warmup_bars: config.warmup_bars,
            }
        } else {
            ClosingRule::Fixed {
                target: config.target,
            }
        }
    }

    /// Threshold for the next bar to open.
    ///
    /// Fails with `ThresholdDegenerate` when the adaptive estimate is zero,
    /// negative or not finite. The estimate is never clamped.
    pub fn threshold(&self, estimator: &ThresholdEstimator) -> Result<Threshold> {
        match *self {
            ClosingRule::Fixed { target } => Ok(Threshold::Gross(target)),
            ClosingRule::Adaptive {
                seed,
                bootstrap,
                warmup_bars,
            } => {
                if estimator.bars_observed() < u64::from(warmup_bars) {
                    return Ok(match bootstrap {
                        Bootstrap::Seed => Threshold::Imbalance(seed),
                        Bootstrap::FixedTarget => Threshold::Gross(seed),
                    });
                }
                let expected = estimator.expected_imbalance().unwrap_or(0.0);
                if expected.is_finite() && expected > 0.0 {
                    Ok(Threshold::Imbalance(expected))
                } else {
                    Err(Error::ThresholdDegenerate {
                        bars_closed: estimator.bars_observed(),
                        threshold: expected,
                    })
                }
            }
        }
    }
}
