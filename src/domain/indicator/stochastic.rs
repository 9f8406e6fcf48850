//! Stochastic Oscillator indicator.
//!
//! %K = (Close - Lowest Low) / (Highest High - Lowest Low) * 100
//! %D = SMA(%K, d_window)
//!
//! Scored with the same oversold/overbought mapping as RSI, using %K.
//! Needs high/low; close-only series get a neutral reading. %K always
//! places the close in the range, whatever the configured price column.

use crate::domain::error::ScanError;
use crate::domain::indicator::math::{last, sma};
use crate::domain::indicator::rsi::band_score;
use crate::domain::indicator::{
    show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "stochastic";

const METRICS: [&str; 2] = ["stoch_k", "stoch_d"];

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "Stochastic",
        description: "Close relative to the recent high/low range",
        params: vec![
            ParamSpec::window("k_window", 14, "%K lookback"),
            ParamSpec::window("d_window", 3, "%D smoothing"),
            ParamSpec::real("lower", 20.0, 0.0, Some(100.0), "Oversold threshold"),
            ParamSpec::real("upper", 80.0, 0.0, Some(100.0), "Overbought threshold"),
        ],
    }
}

pub struct Stochastic;

/// %K aligned with the inputs; a flat range reads 50.
pub fn percent_k(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..closes.len() {
        let lowest = lows[i + 1 - period..=i]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let highest = highs[i + 1 - period..=i]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        out[i] = Some(if highest != lowest {
            (closes[i] - lowest) / (highest - lowest) * 100.0
        } else {
            50.0
        });
    }
    out
}

impl Indicator for Stochastic {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        Ok(config.window("k_window")? + config.window("d_window")? - 1)
    }

    fn compute(
        &self,
        series: &TimeSeries,
        _column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let k_window = config.window("k_window")?;
        let d_window = config.window("d_window")?;
        let lower = config.get("lower")?;
        let upper = config.get("upper")?;
        if lower >= upper {
            return Err(config.inconsistent(
                "lower",
                format!("must be below upper ({} >= {})", lower, upper),
            ));
        }

        if series.len() < self.min_history(config)? {
            return Ok(IndicatorReading::neutral(METRICS));
        }
        let (Some(highs), Some(lows)) = (series.highs(), series.lows()) else {
            return Ok(IndicatorReading::new(IndicatorSnapshot::new(), 0.0));
        };

        let k_series = percent_k(&highs, &lows, &series.closes(), k_window);
        let k_values: Vec<f64> = k_series.iter().flatten().copied().collect();
        let d = last(&sma(&k_values, d_window));
        let k = last(&k_series);

        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert("stoch_k".into(), k);
        snapshot.insert("stoch_d".into(), d);
        let score = k.map_or(0.0, |v| band_score(v, lower, upper));
        Ok(IndicatorReading::new(snapshot, score))
    }

    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String> {
        if !reading.snapshot.contains_key("stoch_k") {
            return vec!["Stochastic unavailable without high/low data".to_string()];
        }
        let (Ok(lower), Ok(upper)) = (config.get("lower"), config.get("upper")) else {
            return Vec::new();
        };
        let zone = match reading.metric("stoch_k") {
            Some(k) if k < lower => "oversold",
            Some(k) if k > upper => "overbought",
            Some(_) => "mid-range",
            None => "unavailable",
        };
        vec![format!(
            "Stochastic %K {} / %D {} is {}",
            show(reading.metric("stoch_k")),
            show(reading.metric("stoch_d")),
            zone
        )]
    }
}
