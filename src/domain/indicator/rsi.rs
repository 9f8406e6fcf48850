//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Below `lower` is oversold (bullish), above `upper` is overbought
//! (bearish); conviction grows with the distance into the band.

use crate::domain::error::ScanError;
use crate::domain::indicator::math::last;
use crate::domain::indicator::{
    show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "rsi";

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "RSI",
        description: "Relative Strength Index oversold/overbought bands",
        params: vec![
            ParamSpec::window("window", 14, "RSI length"),
            ParamSpec::real("lower", 30.0, 0.0, Some(100.0), "Oversold threshold"),
            ParamSpec::real("upper", 70.0, 0.0, Some(100.0), "Overbought threshold"),
        ],
    }
}

pub struct Rsi;

/// Wilder RSI aligned with `prices`; the first `period` entries are `None`.
pub fn rsi_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return out;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| if c > 0.0 { c } else { 0.0 };
    let loss = |c: f64| if c < 0.0 { -c } else { 0.0 };

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for (i, &change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

/// A window with no movement at all reads as the neutral 50.
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

/// Map an oscillator reading in [0, 100] onto a score given its bands.
pub fn band_score(value: f64, lower: f64, upper: f64) -> f64 {
    if value < lower {
        (lower - value) / lower
    } else if value > upper {
        -(value - upper) / (100.0 - upper)
    } else {
        0.0
    }
}

fn bands(config: &IndicatorConfig) -> Result<(f64, f64), ScanError> {
    let lower = config.get("lower")?;
    let upper = config.get("upper")?;
    if lower >= upper {
        return Err(config.inconsistent(
            "lower",
            format!("must be below upper ({} >= {})", lower, upper),
        ));
    }
    Ok((lower, upper))
}

impl Indicator for Rsi {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        Ok(config.window("window")? + 1)
    }

    fn compute(
        &self,
        series: &TimeSeries,
        column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let window = config.window("window")?;
        let (lower, upper) = bands(config)?;
        let name = format!("rsi_{}", window);

        let prices = match series.column(column) {
            Some(p) if p.len() >= self.min_history(config)? => p,
            _ => return Ok(IndicatorReading::neutral([name])),
        };

        let rsi = last(&rsi_series(&prices, window));
        let score = rsi.map_or(0.0, |v| band_score(v, lower, upper));

        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert(name, rsi);
        Ok(IndicatorReading::new(snapshot, score))
    }

    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String> {
        let (Ok(window), Ok((lower, upper))) = (config.window("window"), bands(config)) else {
            return Vec::new();
        };
        let rsi = reading.metric(&format!("rsi_{}", window));
        let zone = match rsi {
            Some(v) if v < lower => format!("oversold (below {:.0})", lower),
            Some(v) if v > upper => format!("overbought (above {:.0})", upper),
            Some(_) => format!("neutral ({:.0}-{:.0})", lower, upper),
            None => "unavailable".to_string(),
        };
        vec![format!("RSI{} at {} is {}", window, show(rsi), zone)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::testing::closes;
    use approx::assert_relative_eq;

    fn defaults() -> IndicatorConfig {
        schema().defaults(ID)
    }

    #[test]
    fn warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let out = rsi_series(&prices, 14);
        assert_eq!(out.len(), 15);
        assert!(out[..14].iter().all(Option::is_none));
        assert!(out[14].is_some());
    }

    #[test]
    fn all_gains_is_100() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert_relative_eq!(rsi_series(&prices, 14)[14].unwrap(), 100.0);
    }

    #[test]
    fn all_losses_is_0() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        assert_relative_eq!(rsi_series(&prices, 14)[14].unwrap(), 0.0);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        for v in rsi_series(&prices, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {} out of range", v);
        }
    }

    #[test]
    fn known_calculation_is_bullish() {
        let prices = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let rsi = rsi_series(&prices, 14)[14].unwrap();
        assert!(rsi > 50.0 && rsi < 100.0);
    }

    #[test]
    fn band_score_mapping() {
        assert_relative_eq!(band_score(15.0, 30.0, 70.0), 0.5);
        assert_relative_eq!(band_score(85.0, 30.0, 70.0), -0.5);
        assert_eq!(band_score(50.0, 30.0, 70.0), 0.0);
        assert_eq!(band_score(30.0, 30.0, 70.0), 0.0);
        assert_relative_eq!(band_score(0.0, 30.0, 70.0), 1.0);
        assert_relative_eq!(band_score(100.0, 30.0, 70.0), -1.0);
    }

    #[test]
    fn falling_series_is_oversold_and_bullish() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let reading = Rsi
            .compute(&closes(&prices), PriceColumn::Close, &defaults())
            .unwrap();
        assert_relative_eq!(reading.metric("rsi_14").unwrap(), 0.0);
        assert_relative_eq!(reading.score, 1.0);
    }

    #[test]
    fn rising_series_is_overbought_and_bearish() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let reading = Rsi
            .compute(&closes(&prices), PriceColumn::Close, &defaults())
            .unwrap();
        assert_relative_eq!(reading.score, -1.0);
    }

    #[test]
    fn flat_series_is_mid_range_and_neutral() {
        assert_relative_eq!(rsi_series(&[100.0; 15], 14)[14].unwrap(), 50.0);

        let reading = Rsi
            .compute(&closes(&[100.0; 30]), PriceColumn::Close, &defaults())
            .unwrap();
        assert_relative_eq!(reading.metric("rsi_14").unwrap(), 50.0);
        assert_eq!(reading.score, 0.0);
    }

    #[test]
    fn short_history_is_neutral() {
        let reading = Rsi
            .compute(&closes(&[100.0; 10]), PriceColumn::Close, &defaults())
            .unwrap();
        assert_eq!(reading.score, 0.0);
        assert_eq!(reading.snapshot.get("rsi_14"), Some(&None));
    }

    #[test]
    fn inverted_bands_rejected() {
        let cfg = schema()
            .resolve(ID, &IndicatorConfig::new().with("lower", 80.0))
            .unwrap();
        let err = Rsi
            .compute(&closes(&[100.0; 20]), PriceColumn::Close, &cfg)
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidParam { .. }));
    }

    #[test]
    fn explain_names_zone() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let cfg = defaults();
        let reading = Rsi.compute(&closes(&prices), PriceColumn::Close, &cfg).unwrap();
        let lines = Rsi.explain(&reading, &cfg);
        assert_eq!(lines, vec!["RSI14 at 0.00 is oversold (below 30)".to_string()]);
    }
}
