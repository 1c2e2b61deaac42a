//! Bar stream writer.
//!
//! Buffers the closed bars of one instrument-day and persists them as a single
//! CSV partition. The completion marker is written only after the bar file is
//! in place, so an absent marker always means the run did not complete.

use csv::WriterBuilder;
use infobar_bars::RunSummary;
use infobar_core::{Bar, BarMode, Error, InstrumentDay, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Column order of the bar file.
pub const BAR_COLUMNS: [&str; 10] = [
    "t_open",
    "t_close",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "dollar",
    "n_ticks",
    "imbalance_score",
];

/// Contents of the completion marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub symbol: String,
    pub date: String,
    pub mode: BarMode,
    pub complete: bool,
    pub summary: RunSummary,
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Buffered writer for one instrument-day's bar partition.
///
/// Dropping the writer without calling `commit` discards the buffered bars
/// and leaves the partition unmarked.
#[derive(Debug)]
pub struct BarStreamWriter {
    day: InstrumentDay,
    mode: BarMode,
    bars_path: PathBuf,
    marker_path: PathBuf,
    buffer: Vec<Bar>,
}

impl BarStreamWriter {
    /// Start a partition. Clears output left by any earlier run of the same
    /// day so a failing rerun cannot inherit its marker.
    pub fn begin(
        day: InstrumentDay,
        mode: BarMode,
        bars_path: PathBuf,
        marker_path: PathBuf,
    ) -> Result<Self> {
        remove_if_exists(&marker_path)?;
        remove_if_exists(&bars_path)?;
        remove_if_exists(&tmp_path(&bars_path))?;
        Ok(Self {
            day,
            mode,
            bars_path,
            marker_path,
            buffer: Vec::new(),
        })
    }

    /// Accept the next closed bar.
    pub fn push(&mut self, bar: Bar) {
        self.buffer.push(bar);
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Persist the buffered bars, then the completion marker.
    pub fn commit(self, summary: &RunSummary) -> Result<PathBuf> {
        if summary.bars != self.buffer.len() as u64 {
            return Err(Error::data(format!(
                "{}: summary reports {} bars but {} were buffered",
                self.day,
                summary.bars,
                self.buffer.len()
            )));
        }
        if let Some(parent) = self.bars_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = tmp_path(&self.bars_path);
        {
            let mut wtr = WriterBuilder::new()
                .has_headers(false)
                .from_writer(BufWriter::new(File::create(&tmp)?));
            wtr.write_record(BAR_COLUMNS)?;
            for bar in &self.buffer {
                wtr.serialize(bar)?;
            }
            wtr.flush()?;
        }
        fs::rename(&tmp, &self.bars_path)?;

        let marker = CompletionMarker {
            symbol: self.day.symbol.clone(),
            date: self.day.date.to_string(),
            mode: self.mode,
            complete: true,
            summary: summary.clone(),
        };
        let marker_tmp = tmp_path(&self.marker_path);
        fs::write(&marker_tmp, serde_json::to_vec_pretty(&marker)?)?;
        fs::rename(&marker_tmp, &self.marker_path)?;

        Ok(self.bars_path)
    }
}

/// Read a completion marker, if the partition completed.
pub fn read_marker(path: &Path) -> Result<Option<CompletionMarker>> {
    if !path.is_file() {
        return Ok(None);
    }
    let marker = serde_json::from_slice(&fs::read(path)?)?;
    Ok(Some(marker))
}

/// Read a bar file back.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();
    for bar in rdr.deserialize::<Bar>() {
        bars.push(bar?);
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use infobar_bars::run_ticks;
    use infobar_core::{BarConfig, Trade};

    fn day() -> InstrumentDay {
        InstrumentDay::new("AAPL", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    }

    fn paths(root: &Path) -> (PathBuf, PathBuf) {
        let dir = root.join("VB/AAPL/2024-01-02");
        (dir.join("bars.csv"), dir.join("_SUCCESS"))
    }

    fn begin(bars_path: &Path, marker_path: &Path) -> BarStreamWriter {
        BarStreamWriter::begin(
            day(),
            BarMode::Volume,
            bars_path.to_path_buf(),
            marker_path.to_path_buf(),
        )
        .unwrap()
    }

    fn buffer_all(writer: &mut BarStreamWriter, bars: &[Bar]) {
        for bar in bars {
            writer.push(bar.clone());
        }
    }

    fn scenario_output() -> infobar_bars::RunOutput {
        let trades = vec![
            Trade { ts_ns: 1, price: 10.0, size: 100 },
            Trade { ts_ns: 2, price: 10.5, size: 200 },
            Trade { ts_ns: 3, price: 10.2, size: 50 },
            Trade { ts_ns: 4, price: 11.0, size: 300 },
        ];
        run_ticks(&BarConfig::new(BarMode::Volume, 300.0), trades).unwrap()
    }

    #[test]
    fn test_commit_writes_bars_then_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (bars_path, marker_path) = paths(dir.path());
        let output = scenario_output();

        let mut writer = begin(&bars_path, &marker_path);
        buffer_all(&mut writer, &output.bars);
        assert_eq!(writer.buffered(), 2);
        writer.commit(&output.summary).unwrap();

        assert_eq!(read_bars(&bars_path).unwrap(), output.bars);
        let marker = read_marker(&marker_path).unwrap().unwrap();
        assert!(marker.complete);
        assert_eq!(marker.mode, BarMode::Volume);
        assert_eq!(marker.date, "2024-01-02");
        assert_eq!(marker.summary.bars, 2);
        assert_eq!(marker.summary.input_volume, output.summary.input_volume);
        assert!((marker.summary.input_dollar - output.summary.input_dollar).abs() < 1e-9);
        assert!(!tmp_path(&bars_path).exists());
    }

    #[test]
    fn test_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let (bars_path, marker_path) = paths(dir.path());
        let output = scenario_output();
        let mut writer = begin(&bars_path, &marker_path);
        buffer_all(&mut writer, &output.bars);
        writer.commit(&output.summary).unwrap();

        let text = fs::read_to_string(&bars_path).unwrap();
        assert_eq!(text.lines().next().unwrap(), BAR_COLUMNS.join(","));
    }

    #[test]
    fn test_empty_day_still_marked() {
        let dir = tempfile::tempdir().unwrap();
        let (bars_path, marker_path) = paths(dir.path());
        let output = run_ticks(&BarConfig::new(BarMode::Volume, 300.0), Vec::new()).unwrap();

        let writer = begin(&bars_path, &marker_path);
        writer.commit(&output.summary).unwrap();

        assert!(read_bars(&bars_path).unwrap().is_empty());
        assert!(read_marker(&marker_path).unwrap().unwrap().complete);
    }

    #[test]
    fn test_uncommitted_writer_leaves_no_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (bars_path, marker_path) = paths(dir.path());
        let output = scenario_output();

        let mut writer = begin(&bars_path, &marker_path);
        buffer_all(&mut writer, &output.bars);
        drop(writer);

        assert!(!bars_path.exists());
        assert!(read_marker(&marker_path).unwrap().is_none());
    }

    #[test]
    fn test_begin_clears_stale_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (bars_path, marker_path) = paths(dir.path());
        let output = scenario_output();

        let mut writer = begin(&bars_path, &marker_path);
        buffer_all(&mut writer, &output.bars);
        writer.commit(&output.summary).unwrap();
        assert!(marker_path.exists());

        // A rerun that never commits must not inherit the old marker.
        let rerun = begin(&bars_path, &marker_path);
        drop(rerun);
        assert!(!marker_path.exists());
        assert!(!bars_path.exists());
    }

    #[test]
    fn test_commit_rejects_mismatched_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (bars_path, marker_path) = paths(dir.path());
        let output = scenario_output();

        let writer = begin(&bars_path, &marker_path);
        assert!(matches!(writer.commit(&output.summary), Err(Error::Data(_))));
        assert!(!marker_path.exists());
    }
}
