//! PyO3 bindings for the information-driven bar engine.
//!
//! Exposes the Rust bar builders to Python:
//! - Trade and bar types
//! - Tick-rule classification
//! - Streaming bar engine (DB/VB/DIB/VIB)
//! - One-shot bar construction over tick or minute-aggregate lists

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use infobar_bars::{
    run_minute_aggregates, run_ticks, BarEngine, RunOutput, RunSummary as RustRunSummary,
};
use infobar_core::{
    Bar as RustBar, BarConfig, BarMode, Bootstrap, Error as RustError, InputConfig, InputKind,
    MinuteAggregate as RustMinuteAggregate, Trade as RustTrade, TradeSign,
};
use infobar_ingestion::TickRuleClassifier;

fn to_py_err(e: RustError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_bootstrap(name: &str) -> PyResult<Bootstrap> {
    match name.to_ascii_lowercase().as_str() {
        "seed" => Ok(Bootstrap::Seed),
        "fixed_target" | "fixed" => Ok(Bootstrap::FixedTarget),
        other => Err(PyValueError::new_err(format!("unknown bootstrap policy: {other}"))),
    }
}

fn make_config(
    mode: &str,
    target: f64,
    alpha: f64,
    bootstrap: &str,
    warmup_bars: u32,
) -> PyResult<BarConfig> {
    let mode: BarMode = mode.parse().map_err(to_py_err)?;
    let mut config = BarConfig::new(mode, target);
    config.alpha = alpha;
    config.bootstrap = parse_bootstrap(bootstrap)?;
    config.warmup_bars = warmup_bars;
    config.validate().map_err(to_py_err)?;
    Ok(config)
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A single trade. Timestamp in nanoseconds.
#[pyclass]
#[derive(Clone)]
pub struct Trade {
    #[pyo3(get, set)]
    pub ts_ns: i64,
    #[pyo3(get, set)]
    pub price: f64,
    #[pyo3(get, set)]
    pub size: u64,
}

#[pymethods]
impl Trade {
    #[new]
    fn new(ts_ns: i64, price: f64, size: u64) -> Self {
        Trade { ts_ns, price, size }
    }

    #[getter]
    fn dollar(&self) -> f64 {
        self.price * self.size as f64
    }

    fn __repr__(&self) -> String {
        format!("Trade(ts_ns={}, price={}, size={})", self.ts_ns, self.price, self.size)
    }
}

impl From<Trade> for RustTrade {
    fn from(t: Trade) -> Self {
        RustTrade {
            ts_ns: t.ts_ns,
            price: t.price,
            size: t.size,
        }
    }
}

/// A one-minute OHLCV aggregate, stamped at minute open unless configured otherwise.
#[pyclass]
#[derive(Clone)]
pub struct MinuteAggregate {
    #[pyo3(get, set)]
    pub ts_ns: i64,
    #[pyo3(get, set)]
    pub open: f64,
    #[pyo3(get, set)]
    pub high: f64,
    #[pyo3(get, set)]
    pub low: f64,
    #[pyo3(get, set)]
    pub close: f64,
    #[pyo3(get, set)]
    pub volume: u64,
}

#[pymethods]
impl MinuteAggregate {
    #[new]
    fn new(ts_ns: i64, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        MinuteAggregate { ts_ns, open, high, low, close, volume }
    }
}

impl From<MinuteAggregate> for RustMinuteAggregate {
    fn from(m: MinuteAggregate) -> Self {
        RustMinuteAggregate {
            ts_ns: m.ts_ns,
            open: m.open,
            high: m.high,
            low: m.low,
            close: m.close,
            volume: m.volume,
        }
    }
}

/// A closed information-driven bar.
#[pyclass]
#[derive(Clone)]
pub struct Bar {
    #[pyo3(get)]
    pub t_open: i64,
    #[pyo3(get)]
    pub t_close: i64,
    #[pyo3(get)]
    pub open: f64,
    #[pyo3(get)]
    pub high: f64,
    #[pyo3(get)]
    pub low: f64,
    #[pyo3(get)]
    pub close: f64,
    #[pyo3(get)]
    pub volume: u64,
    #[pyo3(get)]
    pub dollar: f64,
    #[pyo3(get)]
    pub n_ticks: u64,
    #[pyo3(get)]
    pub imbalance_score: f64,
}

#[pymethods]
impl Bar {
    #[getter]
    fn vwap(&self) -> Option<f64> {
        (self.volume > 0).then(|| self.dollar / self.volume as f64)
    }

    fn __repr__(&self) -> String {
        format!(
            "Bar(t_open={}, t_close={}, close={}, volume={}, n_ticks={})",
            self.t_open, self.t_close, self.close, self.volume, self.n_ticks
        )
    }
}

impl From<RustBar> for Bar {
    fn from(b: RustBar) -> Self {
        Bar {
            t_open: b.t_open,
            t_close: b.t_close,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
            dollar: b.dollar,
            n_ticks: b.n_ticks,
            imbalance_score: b.imbalance_score,
        }
    }
}

/// Summary of a finished run.
#[pyclass]
#[derive(Clone)]
pub struct RunSummary {
    #[pyo3(get)]
    pub source: String,
    #[pyo3(get)]
    pub trades_in: u64,
    #[pyo3(get)]
    pub trades_accepted: u64,
    #[pyo3(get)]
    pub trades_dropped: u64,
    #[pyo3(get)]
    pub empty_minutes: u64,
    #[pyo3(get)]
    pub input_volume: u64,
    #[pyo3(get)]
    pub input_dollar: f64,
    #[pyo3(get)]
    pub bars: u64,
    #[pyo3(get)]
    pub trailing_ticks_discarded: u64,
    #[pyo3(get)]
    pub final_threshold: f64,
    #[pyo3(get)]
    pub expected_bar_size: Option<f64>,
}

impl From<RustRunSummary> for RunSummary {
    fn from(s: RustRunSummary) -> Self {
        RunSummary {
            source: match s.source {
                InputKind::Ticks => "ticks".to_string(),
                InputKind::MinuteAggregates => "minute_aggregates".to_string(),
            },
            trades_in: s.trades_in,
            trades_accepted: s.trades_accepted,
            trades_dropped: s.drops.total(),
            empty_minutes: s.empty_minutes,
            input_volume: s.input_volume,
            input_dollar: s.input_dollar,
            bars: s.bars,
            trailing_ticks_discarded: s.trailing_ticks_discarded,
            final_threshold: s.final_threshold,
            expected_bar_size: s.expected_bar_size,
        }
    }
}

fn split_output(output: RunOutput) -> (Vec<Bar>, RunSummary) {
    let bars = output.bars.into_iter().map(Bar::from).collect();
    (bars, output.summary.into())
}

// ============================================================================
// Python-exposed Engine Classes
// ============================================================================

/// Tick-rule trade sign classifier.
#[pyclass]
pub struct PyTickRuleClassifier {
    inner: TickRuleClassifier,
}

#[pymethods]
impl PyTickRuleClassifier {
    #[new]
    fn new() -> Self {
        PyTickRuleClassifier {
            inner: TickRuleClassifier::new(),
        }
    }

    /// Sign of a trade: 1 buy, -1 sell, 0 unsigned.
    fn classify(&mut self, trade: Trade) -> i8 {
        self.inner.classify(trade.into()).sign.sign()
    }

    /// Signs for a batch of trades, in order.
    fn classify_batch(&mut self, trades: Vec<Trade>) -> Vec<i8> {
        let rust_trades: Vec<RustTrade> = trades.into_iter().map(|t| t.into()).collect();
        self.inner
            .classify_batch(&rust_trades)
            .into_iter()
            .map(|st| st.sign.sign())
            .collect()
    }

    /// (buy_trades, sell_trades, unsigned_trades)
    fn stats(&self) -> (u64, u64, u64) {
        let s = self.inner.stats();
        (s.buy_trades, s.sell_trades, s.unsigned_trades)
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Streaming bar engine for one instrument-day.
#[pyclass]
pub struct PyBarEngine {
    inner: Option<BarEngine>,
}

impl PyBarEngine {
    fn engine(&mut self) -> PyResult<&mut BarEngine> {
        self.inner
            .as_mut()
            .ok_or_else(|| PyValueError::new_err("engine already finished"))
    }
}

#[pymethods]
impl PyBarEngine {
    #[new]
    #[pyo3(signature = (mode, target, alpha=0.1, bootstrap="seed", warmup_bars=1))]
    fn new(
        mode: &str,
        target: f64,
        alpha: f64,
        bootstrap: &str,
        warmup_bars: u32,
    ) -> PyResult<Self> {
        let config = make_config(mode, target, alpha, bootstrap, warmup_bars)?;
        let engine = BarEngine::new(&config, InputKind::Ticks).map_err(to_py_err)?;
        Ok(PyBarEngine { inner: Some(engine) })
    }

    /// Feed one trade. Returns the bar it closed, if any.
    fn push(&mut self, trade: Trade) -> PyResult<Option<Bar>> {
        let bar = self.engine()?.push(trade.into()).map_err(to_py_err)?;
        Ok(bar.cloned().map(Bar::from))
    }

    /// Threshold the next bar will open with.
    fn threshold(&mut self) -> PyResult<f64> {
        Ok(self.engine()?.threshold().value())
    }

    /// End the run, discarding any partial bar.
    fn finish(&mut self) -> PyResult<(Vec<Bar>, RunSummary)> {
        let engine = self
            .inner
            .take()
            .ok_or_else(|| PyValueError::new_err("engine already finished"))?;
        Ok(split_output(engine.finish()))
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Build bars for one instrument-day of trades.
#[pyfunction]
#[pyo3(signature = (trades, mode, target, alpha=0.1, bootstrap="seed", warmup_bars=1))]
fn build_bars(
    trades: Vec<Trade>,
    mode: &str,
    target: f64,
    alpha: f64,
    bootstrap: &str,
    warmup_bars: u32,
) -> PyResult<(Vec<Bar>, RunSummary)> {
    let config = make_config(mode, target, alpha, bootstrap, warmup_bars)?;
    let output = run_ticks(&config, trades.into_iter().map(RustTrade::from))
        .map_err(to_py_err)?;
    Ok(split_output(output))
}

/// Build bars for one instrument-day from minute aggregates.
#[pyfunction]
#[pyo3(signature = (
    minutes,
    mode,
    target,
    alpha=0.1,
    bootstrap="seed",
    warmup_bars=1,
    stamped_at_open=true
))]
fn build_bars_from_minutes(
    minutes: Vec<MinuteAggregate>,
    mode: &str,
    target: f64,
    alpha: f64,
    bootstrap: &str,
    warmup_bars: u32,
    stamped_at_open: bool,
) -> PyResult<(Vec<Bar>, RunSummary)> {
    let config = make_config(mode, target, alpha, bootstrap, warmup_bars)?;
    let input = InputConfig {
        aggregate_stamped_at_open: stamped_at_open,
        ..InputConfig::default()
    };
    let minutes: Vec<RustMinuteAggregate> = minutes.into_iter().map(|m| m.into()).collect();
    let output = run_minute_aggregates(&config, &input, &minutes).map_err(to_py_err)?;
    Ok(split_output(output))
}

/// Tick rule for a single price change: 1, -1 or 0.
#[pyfunction]
#[pyo3(signature = (price, prev_price=None, last_sign=0))]
fn tick_rule(price: f64, prev_price: Option<f64>, last_sign: i8) -> i8 {
    let last = match last_sign.signum() {
        1 => TradeSign::Buy,
        -1 => TradeSign::Sell,
        _ => TradeSign::Unsigned,
    };
    infobar_ingestion::tick_rule(price, prev_price, last).sign()
}

// ============================================================================
// Module Definition
// ============================================================================

/// Information-driven bars - Rust bar builders for Python.
#[pymodule]
fn infobar(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<Trade>()?;
    m.add_class::<MinuteAggregate>()?;
    m.add_class::<Bar>()?;
    m.add_class::<RunSummary>()?;

    // Engine classes
    m.add_class::<PyTickRuleClassifier>()?;
    m.add_class::<PyBarEngine>()?;

    // Functions
    m.add_function(wrap_pyfunction!(build_bars, m)?)?;
    m.add_function(wrap_pyfunction!(build_bars_from_minutes, m)?)?;
    m.add_function(wrap_pyfunction!(tick_rule, m)?)?;

    Ok(())
}
