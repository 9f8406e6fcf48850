//! ATR (Average True Range) indicator.
//!
//! Volatility context only; the score is always 0. `atr_pct` expresses the
//! range relative to the latest close so funds at different price levels
//! compare. True range is defined on high/low/close, so the configured price
//! column plays no part.

use crate::domain::error::ScanError;
use crate::domain::indicator::math::{atr, last};
use crate::domain::indicator::{
    show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "atr";

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "ATR",
        description: "Average true range (volatility context, never directional)",
        params: vec![ParamSpec::window("window", 14, "Wilder smoothing length")],
    }
}

pub struct Atr;

impl Indicator for Atr {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        Ok(config.window("window")? + 1)
    }

    fn compute(
        &self,
        series: &TimeSeries,
        _column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let window = config.window("window")?;
        let name = format!("atr_{}", window);

        if series.len() < self.min_history(config)? {
            return Ok(IndicatorReading::neutral([name, "atr_pct".to_string()]));
        }
        let Some(ranges) = series.true_ranges() else {
            return Ok(IndicatorReading::new(IndicatorSnapshot::new(), 0.0));
        };

        let value = last(&atr(&ranges, window));
        let close = series.closes().last().copied();
        let pct = value
            .zip(close)
            .filter(|&(_, c)| c != 0.0)
            .map(|(a, c)| a / c.abs() * 100.0);

        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert(name, value);
        snapshot.insert("atr_pct".into(), pct);
        Ok(IndicatorReading::new(snapshot, 0.0))
    }

    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String> {
        let Ok(window) = config.window("window") else {
            return Vec::new();
        };
        let key = format!("atr_{}", window);
        if !reading.snapshot.contains_key(&key) {
            return vec!["ATR unavailable without high/low data".to_string()];
        }
        vec![format!(
            "ATR{} {} ({}% of price)",
            window,
            show(reading.metric(&key)),
            show(reading.metric("atr_pct"))
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::testing::{closes, ohlcv};
    use approx::assert_relative_eq;

    fn defaults() -> IndicatorConfig {
        schema().defaults(ID)
    }

    #[test]
    fn constant_range_gives_constant_atr() {
        let series = ohlcv(&[100.0; 30], 1.0, 1000.0);
        let reading = Atr.compute(&series, PriceColumn::Close, &defaults()).unwrap();
        assert_relative_eq!(reading.metric("atr_14").unwrap(), 2.0);
        assert_relative_eq!(reading.metric("atr_pct").unwrap(), 2.0);
        assert_eq!(reading.score, 0.0);
    }

    #[test]
    fn gaps_widen_true_range() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + (i * 5) as f64).collect();
        let series = ohlcv(&prices, 1.0, 1000.0);
        let reading = Atr.compute(&series, PriceColumn::Close, &defaults()).unwrap();
        // every bar after the first gaps 5 above the prior close: TR = 6
        assert!(reading.metric("atr_14").unwrap() > 5.0);
    }

    #[test]
    fn price_column_does_not_change_range() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i % 4) as f64).collect();
        let series = ohlcv(&prices, 2.0, 1000.0);
        let by_close = Atr.compute(&series, PriceColumn::Close, &defaults()).unwrap();
        for column in [PriceColumn::Open, PriceColumn::High, PriceColumn::Volume] {
            let reading = Atr.compute(&series, column, &defaults()).unwrap();
            assert_eq!(reading.metric("atr_14"), by_close.metric("atr_14"), "{column}");
            assert_eq!(reading.metric("atr_pct"), by_close.metric("atr_pct"), "{column}");
        }
    }

    #[test]
    fn close_only_series_omits_metrics() {
        let reading = Atr
            .compute(&closes(&[100.0; 30]), PriceColumn::Close, &defaults())
            .unwrap();
        assert!(reading.snapshot.is_empty());
        assert_eq!(reading.score, 0.0);
        assert!(Atr.explain(&reading, &defaults())[0].contains("unavailable"));
    }

    #[test]
    fn short_history_marks_unavailable() {
        let series = ohlcv(&[100.0; 10], 1.0, 1000.0);
        let reading = Atr.compute(&series, PriceColumn::Close, &defaults()).unwrap();
        assert_eq!(reading.snapshot.get("atr_14"), Some(&None));
        assert_eq!(reading.snapshot.get("atr_pct"), Some(&None));
    }
}
