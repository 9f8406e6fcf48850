//! OHLCV bars and the per-instrument time series.

use crate::domain::error::ScanError;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// One daily observation. Only the close is mandatory; fund NAV feeds
/// usually carry nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

impl OhlcvBar {
    /// Close-only bar.
    pub fn close_only(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    ///
    /// `None` when the bar has no high/low.
    pub fn true_range(&self, prev_close: f64) -> Option<f64> {
        let (high, low) = (self.high?, self.low?);
        let hl = high - low;
        let hc = (high - prev_close).abs();
        let lc = (low - prev_close).abs();
        Some(hl.max(hc).max(lc))
    }
}

/// Column an indicator reads its price from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceColumn {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl FromStr for PriceColumn {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceColumn::Open),
            "high" => Ok(PriceColumn::High),
            "low" => Ok(PriceColumn::Low),
            "close" | "price" => Ok(PriceColumn::Close),
            "volume" => Ok(PriceColumn::Volume),
            _ => Err(ScanError::UnknownColumn {
                column: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PriceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceColumn::Open => "open",
            PriceColumn::High => "high",
            PriceColumn::Low => "low",
            PriceColumn::Close => "close",
            PriceColumn::Volume => "volume",
        };
        f.write_str(name)
    }
}

/// Ordered bars for a single instrument.
///
/// Dates are strictly increasing. The series is read-only once built;
/// indicators derive their own vectors from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    bars: Vec<OhlcvBar>,
}

impl TimeSeries {
    pub fn new(bars: Vec<OhlcvBar>) -> Result<Self, ScanError> {
        if let Some(index) = bars
            .windows(2)
            .position(|pair| pair[1].date <= pair[0].date)
        {
            return Err(ScanError::UnorderedSeries { index: index + 1 });
        }
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Values of `column`, or `None` if any bar lacks it.
    pub fn column(&self, column: PriceColumn) -> Option<Vec<f64>> {
        match column {
            PriceColumn::Close => Some(self.closes()),
            PriceColumn::Open => self.bars.iter().map(|b| b.open).collect(),
            PriceColumn::High => self.highs(),
            PriceColumn::Low => self.lows(),
            PriceColumn::Volume => self.volumes(),
        }
    }

    pub fn highs(&self) -> Option<Vec<f64>> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Option<Vec<f64>> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Option<Vec<f64>> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// True ranges for every bar; the first bar uses high - low.
    pub fn true_ranges(&self) -> Option<Vec<f64>> {
        let mut out = Vec::with_capacity(self.bars.len());
        for (i, bar) in self.bars.iter().enumerate() {
            let tr = if i == 0 {
                bar.high? - bar.low?
            } else {
                bar.true_range(self.bars[i - 1].close)?
            };
            out.push(tr);
        }
        Some(out)
    }
}
