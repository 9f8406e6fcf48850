//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Score is the histogram as a fraction of price times `scale`, clamped to
//! [-1, 1]. A signal-line cross on the latest bar forces ±1.

use crate::domain::error::ScanError;
use crate::domain::indicator::cross::{crossed_above_last, crossed_below_last};
use crate::domain::indicator::math::{ema, ema_of_optional, last};
use crate::domain::indicator::{
    show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "macd";

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

const METRICS: [&str; 3] = ["macd", "macd_signal", "macd_histogram"];

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "MACD",
        description: "Histogram of MACD against its signal line",
        params: vec![
            ParamSpec::window("fast", DEFAULT_FAST, "Fast EMA length"),
            ParamSpec::window("slow", DEFAULT_SLOW, "Slow EMA length"),
            ParamSpec::window("signal", DEFAULT_SIGNAL, "Signal EMA length"),
            ParamSpec::real(
                "scale",
                100.0,
                0.0,
                None,
                "Multiplier applied to histogram / price",
            ),
        ],
    }
}

pub struct Macd;

struct Params {
    fast: usize,
    slow: usize,
    signal: usize,
    scale: f64,
}

fn params(config: &IndicatorConfig) -> Result<Params, ScanError> {
    let fast = config.window("fast")?;
    let slow = config.window("slow")?;
    if fast >= slow {
        return Err(config.inconsistent(
            "fast",
            format!("must be below slow ({} >= {})", fast, slow),
        ));
    }
    Ok(Params {
        fast,
        slow,
        signal: config.window("signal")?,
        scale: config.get("scale")?,
    })
}

/// MACD line, signal line and histogram, aligned with `prices`.
pub fn macd_lines(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let ema_fast = ema(prices, fast);
    let ema_slow = ema(prices, slow);
    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_of_optional(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();
    (line, signal_line, histogram)
}

impl Indicator for Macd {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        let p = params(config)?;
        Ok(p.slow + p.signal - 1)
    }

    fn compute(
        &self,
        series: &TimeSeries,
        column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let p = params(config)?;
        let prices = match series.column(column) {
            Some(v) if v.len() >= self.min_history(config)? => v,
            _ => return Ok(IndicatorReading::neutral(METRICS)),
        };

        let (line, signal, histogram) = macd_lines(&prices, p.fast, p.slow, p.signal);
        let hist_now = last(&histogram);
        let price_now = prices[prices.len() - 1];

        let score = if crossed_above_last(&line, &signal) {
            1.0
        } else if crossed_below_last(&line, &signal) {
            -1.0
        } else {
            match hist_now {
                Some(h) if price_now != 0.0 => h / price_now.abs() * p.scale,
                _ => 0.0,
            }
        };

        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert("macd".into(), last(&line));
        snapshot.insert("macd_signal".into(), last(&signal));
        snapshot.insert("macd_histogram".into(), hist_now);
        Ok(IndicatorReading::new(snapshot, score))
    }

    fn explain(&self, reading: &IndicatorReading, _config: &IndicatorConfig) -> Vec<String> {
        let line = show(reading.metric("macd"));
        let signal = show(reading.metric("macd_signal"));
        let hist = show(reading.metric("macd_histogram"));
        let verdict = match reading.score {
            s if s >= 0.5 => "bullish momentum",
            s if s > 0.0 => "mildly bullish",
            s if s <= -0.5 => "bearish momentum",
            s if s < 0.0 => "mildly bearish",
            _ => "flat",
        };
        vec![format!(
            "MACD {} vs signal {} (histogram {}): {}",
            line, signal, hist, verdict
        )]
    }
}
