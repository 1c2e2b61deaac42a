//! Per instrument-day bar engine.
//!
//! Wires validation, tick-rule classification, accumulation and threshold
//! estimation into one single-pass run. Each run owns all of its state; runs
//! for different instrument-days share nothing.

use infobar_core::{
    Bar, BarConfig, Error, InputConfig, InputKind, MinuteAggregate, Result, Trade,
};
use infobar_ingestion::{
    AggregateFallbackAdapter, ClassificationStats, DropStats, TickRuleClassifier, TradeValidator,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::accumulator::BarAccumulator;
use crate::threshold::{ClosingRule, Threshold, ThresholdEstimator, ThresholdState};

/// What a run consumed and produced. Written into the completion marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Input that fed the run.
    pub source: InputKind,
    /// Trades offered to the engine (including dropped ones).
    pub trades_in: u64,
    /// Trades that passed validation.
    pub trades_accepted: u64,
    /// Dropped trades by reason.
    pub drops: DropStats,
    /// Zero-volume minutes skipped in fallback mode.
    pub empty_minutes: u64,
    /// Σ size over accepted trades.
    pub input_volume: u64,
    /// Σ price * size over accepted trades.
    pub input_dollar: f64,
    /// Bars emitted.
    pub bars: u64,
    /// Ticks in the trailing partial bar that was not emitted.
    pub trailing_ticks_discarded: u64,
    /// Tick-rule classification counts.
    pub classification: ClassificationStats,
    /// Threshold the next bar would have opened with.
    pub final_threshold: f64,
    /// Expected unsigned bar size (ticks per bar * value per tick), once known.
    pub expected_bar_size: Option<f64>,
    /// Estimator state at end of run.
    pub estimator: ThresholdState,
}

/// Result of one instrument-day run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Closed bars in non-decreasing open order. Trades sharing a timestamp
    /// can open consecutive bars with the same `t_open`.
    pub bars: Vec<Bar>,
    /// Set once the whole input was consumed, even when no bars were produced.
    pub complete: bool,
    pub summary: RunSummary,
}

/// Streaming bar engine for one instrument-day.
pub struct BarEngine {
    config: BarConfig,
    source: InputKind,
    rule: ClosingRule,
    validator: TradeValidator,
    classifier: TickRuleClassifier,
    accumulator: BarAccumulator,
    estimator: ThresholdEstimator,
    /// Threshold for the next bar to open.
    threshold: Threshold,
    bars: Vec<Bar>,
    input_volume: u64,
    input_dollar: f64,
    empty_minutes: u64,
}

impl BarEngine {
    /// Create an engine. Rejects invalid configuration before any trade is seen.
    pub fn new(config: &BarConfig, source: InputKind) -> Result<Self> {
        config.validate()?;
        let rule = ClosingRule::from_config(config);
        let estimator = ThresholdEstimator::new(config.alpha);
        let threshold = rule.threshold(&estimator)?;

        Ok(Self {
            config: config.clone(),
            source,
            rule,
            validator: TradeValidator::new(),
            classifier: TickRuleClassifier::new(),
            accumulator: BarAccumulator::new(config.mode),
            estimator,
            threshold,
            bars: Vec::new(),
            input_volume: 0,
            input_dollar: 0.0,
            empty_minutes: 0,
        })
    }

    /// Feed one trade. Returns the bar it closed, if any.
    ///
    /// Malformed trades are dropped and counted; they never fail the run.
    /// A degenerate adaptive threshold does.
    pub fn push(&mut self, trade: Trade) -> Result<Option<&Bar>> {
        let trade = match self.validator.check(trade) {
            Ok(trade) => trade,
            Err(Error::MalformedTrade { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        self.input_volume += trade.size;
        self.input_dollar += trade.dollar();

        let signed = self.classifier.classify(trade);
        let Some(bar) = self.accumulator.push(&signed, self.threshold) else {
            return Ok(None);
        };

        self.estimator.update_from_bar(&bar, self.config.mode);
        self.threshold = self.rule.threshold(&self.estimator)?;
        self.bars.push(bar);
        Ok(self.bars.last())
    }

    /// Feed trades in order.
    pub fn extend<I>(&mut self, trades: I) -> Result<()>
    where
        I: IntoIterator<Item = Trade>,
    {
        for trade in trades {
            self.push(trade)?;
        }
        Ok(())
    }

    /// Bars closed so far.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Current threshold for the next bar to open.
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// End the run. The open partial bar, if any, is discarded.
    pub fn finish(mut self) -> RunOutput {
        let trailing = self.accumulator.discard();
        if trailing > 0 {
            debug!(ticks = trailing, "Discarding trailing partial bar");
        }

        let drops = self.validator.drops().clone();
        if drops.total() > 0 {
            warn!(
                dropped = drops.total(),
                out_of_order = drops.out_of_order,
                "Run dropped malformed trades"
            );
        }

        let summary = RunSummary {
            source: self.source,
            trades_in: self.validator.seen(),
            trades_accepted: self.validator.seen() - drops.total(),
            drops,
            empty_minutes: self.empty_minutes,
            input_volume: self.input_volume,
            input_dollar: self.input_dollar,
            bars: self.bars.len() as u64,
            trailing_ticks_discarded: trailing,
            classification: self.classifier.stats().clone(),
            final_threshold: self.threshold.value(),
            expected_bar_size: self.estimator.expected_bar_value(),
            estimator: self.estimator.state(),
        };

        RunOutput {
            bars: self.bars,
            complete: true,
            summary,
        }
    }
}

/// Build bars for one instrument-day of ticks.
pub fn run_ticks<I>(config: &BarConfig, trades: I) -> Result<RunOutput>
where
    I: IntoIterator<Item = Trade>,
{
    let mut engine = BarEngine::new(config, InputKind::Ticks)?;
    engine.extend(trades)?;
    Ok(engine.finish())
}

/// Build bars for one instrument-day from minute aggregates (fallback mode).
pub fn run_minute_aggregates(
    config: &BarConfig,
    input: &InputConfig,
    minutes: &[MinuteAggregate],
) -> Result<RunOutput> {
    let mut engine = BarEngine::new(config, InputKind::MinuteAggregates)?;
    let mut adapter = AggregateFallbackAdapter::new(input.clone());
    engine.extend(adapter.synthesize(minutes))?;
    engine.empty_minutes = adapter.empty_minutes();
    Ok(engine.finish())
}
