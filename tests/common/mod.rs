#![allow(dead_code)]

use chrono::NaiveDate;
use fundscan::domain::error::ScanError;
pub use fundscan::domain::ohlcv::{OhlcvBar, TimeSeries};
use fundscan::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<TimeSeries, ScanError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(ScanError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(code).ok_or_else(|| ScanError::NoData {
            code: code.to_string(),
        })?;
        TimeSeries::new(
            bars.iter()
                .filter(|b| start_date.is_none_or(|s| b.date >= s))
                .filter(|b| end_date.is_none_or(|e| b.date <= e))
                .cloned()
                .collect(),
        )
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScanError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ScanError> {
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(i: usize) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(i as i64)
}

/// Close-only bars on consecutive days from 2024-01-01.
pub fn close_bars(prices: &[f64]) -> Vec<OhlcvBar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| OhlcvBar::close_only(day(i), p))
        .collect()
}

/// Full bars with a symmetric `spread` around the close and constant volume.
pub fn ohlcv_bars(prices: &[f64], spread: f64, volume: f64) -> Vec<OhlcvBar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| OhlcvBar {
            date: day(i),
            open: Some(p),
            high: Some(p + spread),
            low: Some(p - spread),
            close: p,
            volume: Some(volume),
        })
        .collect()
}

pub fn series(bars: Vec<OhlcvBar>) -> TimeSeries {
    TimeSeries::new(bars).unwrap()
}

/// Flat at 100 for 55 bars, then rising one point per bar. The 20/50 EMA
/// crossover lands on bar 55.
pub fn breakout_prices(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| if i < 55 { 100.0 } else { 100.0 + (i - 54) as f64 })
        .collect()
}

/// Deterministic zig-zag trend: `drift` per bar plus an alternating wiggle.
pub fn wave_prices(len: usize, start: f64, drift: f64, wiggle: f64) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let sign = if (i / 3) % 2 == 0 { 1.0 } else { -1.0 };
            start + drift * i as f64 + sign * wiggle * ((i % 3) as f64)
        })
        .collect()
}

/// CSV text for `bars` with every column present.
pub fn to_csv(bars: &[OhlcvBar]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date.format("%Y-%m-%d"),
            cell(b.open),
            cell(b.high),
            cell(b.low),
            b.close,
            cell(b.volume)
        ));
    }
    out
}
