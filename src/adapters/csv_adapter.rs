//! CSV file data adapter.
//!
//! One `<CODE>.csv` per instrument. Columns are located by header name:
//! `date` and `close` (or `price`) are required; `open`, `high`, `low` and
//! `volume` are optional, and an empty cell counts as missing.

use crate::domain::error::ScanError;
use crate::domain::ohlcv::{OhlcvBar, TimeSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Column positions resolved from the header row.
struct Layout {
    date: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord, path: &str) -> Result<Self, ScanError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };
        let missing = |column: &str| ScanError::DataSource {
            reason: format!("{}: missing required column '{}'", path, column),
        };
        Ok(Self {
            date: find(&["date"]).ok_or_else(|| missing("date"))?,
            close: find(&["close", "price"]).ok_or_else(|| missing("close"))?,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
            volume: find(&["volume"]),
        })
    }
}

fn parse_cell(
    record: &csv::StringRecord,
    index: Option<usize>,
    column: &str,
    line: u64,
) -> Result<Option<f64>, ScanError> {
    let Some(raw) = index.and_then(|i| record.get(i)).map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|e| ScanError::DataSource {
        reason: format!("line {}: invalid {} value '{}': {}", line, column, raw, e),
    })
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn read_bars(&self, code: &str) -> Result<Vec<OhlcvBar>, ScanError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScanError::NoData {
                code: code.to_string(),
            },
            _ => ScanError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| ScanError::DataSource {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let layout = Layout::from_headers(headers, &path.display().to_string())?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| ScanError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let date_str = record.get(layout.date).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                ScanError::DataSource {
                    reason: format!("line {}: invalid date '{}': {}", line, date_str, e),
                }
            })?;
            let close = parse_cell(&record, Some(layout.close), "close", line)?.ok_or_else(
                || ScanError::DataSource {
                    reason: format!("line {}: missing close value", line),
                },
            )?;

            bars.push(OhlcvBar {
                date,
                open: parse_cell(&record, layout.open, "open", line)?,
                high: parse_cell(&record, layout.high, "high", line)?,
                low: parse_cell(&record, layout.low, "low", line)?,
                close,
                volume: parse_cell(&record, layout.volume, "volume", line)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<TimeSeries, ScanError> {
        let bars = self
            .read_bars(code)?
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .collect();
        TimeSeries::new(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ScanError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScanError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(code) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ScanError> {
        let bars = match self.read_bars(code) {
            Ok(bars) => bars,
            Err(ScanError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
