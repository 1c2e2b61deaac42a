//! Batch driver.
//!
//! Fans instrument-days out over a rayon pool. Days share nothing: each one
//! reads its own input, owns its own engine and writes its own partition, so
//! a failing day never affects its siblings.

use infobar_bars::{run_minute_aggregates, run_ticks, RunOutput, RunSummary};
use infobar_core::{Config, Error, InstrumentDay, Result};
use infobar_ingestion::{read_minute_aggregates, read_trades};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{error, info, warn};

use crate::layout::{InputSource, PartitionLayout};
use crate::report::{BatchReport, DayOutcome};
use crate::writer::BarStreamWriter;

/// Runs bar construction for many instrument-days.
pub struct BatchDriver {
    config: Config,
    layout: PartitionLayout,
    pool: ThreadPool,
}

impl BatchDriver {
    /// Validate configuration and build the worker pool.
    ///
    /// Invalid configuration is fatal here, before any instrument-day runs.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.batch.workers)
            .thread_name(|i| format!("infobar-worker-{i}"))
            .build()
            .map_err(|e| Error::config(format!("cannot build worker pool: {e}")))?;

        Ok(Self {
            layout: PartitionLayout::new(config.layout.clone()),
            config,
            pool,
        })
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    /// Process every instrument-day found under the input root.
    pub fn run_all(&self) -> Result<BatchReport> {
        let days = self.layout.discover()?;
        Ok(self.run(&days))
    }

    /// Process the given instrument-days concurrently. Outcomes keep input order.
    pub fn run(&self, days: &[InstrumentDay]) -> BatchReport {
        info!(
            days = days.len(),
            mode = %self.config.bars.mode,
            workers = self.pool.current_num_threads(),
            "Starting batch"
        );

        let outcomes: Vec<(InstrumentDay, DayOutcome)> = self.pool.install(|| {
            days.par_iter()
                .map(|day| (day.clone(), self.run_day(day)))
                .collect()
        });
        let report = BatchReport { outcomes };

        info!(
            completed = report.completed(),
            skipped = report.skipped(),
            failed = report.failed(),
            bars = report.total_bars(),
            "Batch finished"
        );
        report
    }

    /// Process one instrument-day and classify the result.
    pub fn run_day(&self, day: &InstrumentDay) -> DayOutcome {
        match self.process_day(day) {
            Ok(summary) => {
                info!(
                    day = %day,
                    source = ?summary.source,
                    bars = summary.bars,
                    dropped = summary.drops.total(),
                    "Run completed"
                );
                DayOutcome::Completed(summary)
            }
            Err(Error::MissingInput(reason)) => {
                warn!(day = %day, %reason, "Skipping instrument-day");
                DayOutcome::Skipped { reason }
            }
            Err(e) => {
                error!(day = %day, kind = e.kind(), error = %e, "Run failed");
                DayOutcome::Failed {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    fn process_day(&self, day: &InstrumentDay) -> Result<RunSummary> {
        let bars_cfg = &self.config.bars;
        // Clear earlier output first: a day skipped now must not keep an old marker.
        let mut writer = BarStreamWriter::begin(
            day.clone(),
            bars_cfg.mode,
            self.layout.bars_path(bars_cfg.mode, day),
            self.layout.marker_path(bars_cfg.mode, day),
        )?;
        let source = self.layout.resolve_input(day, bars_cfg.fallback_enabled)?;

        let unit = self.config.input.timestamp_unit;
        let output: RunOutput = match source {
            InputSource::Ticks(path) => run_ticks(bars_cfg, read_trades(&path, unit)?)?,
            InputSource::MinuteAggregates(path) => {
                warn!(day = %day, "No tick data, building bars from minute aggregates");
                let minutes = read_minute_aggregates(&path, unit)?;
                run_minute_aggregates(bars_cfg, &self.config.input, &minutes)?
            }
        };

        for bar in output.bars {
            writer.push(bar);
        }
        writer.commit(&output.summary)?;
        Ok(output.summary)
    }
}
