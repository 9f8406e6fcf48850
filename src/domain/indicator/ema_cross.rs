//! EMA crossover indicator.
//!
//! +1 on the bar where the short EMA crosses above the long EMA, -1 on the
//! bar where it crosses below, 0 on every other bar. Holding above or below
//! is not a signal by itself.

use crate::domain::error::ScanError;
use crate::domain::indicator::cross::{crossed_above_last, crossed_below_last};
use crate::domain::indicator::math::{ema, last};
use crate::domain::indicator::{
    flag, show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "ema_cross";

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "EMA Crossover",
        description: "Short EMA crossing the long EMA on the latest bar",
        params: vec![
            ParamSpec::window("short_window", 20, "Short EMA length"),
            ParamSpec::window("long_window", 50, "Long EMA length"),
        ],
    }
}

pub struct EmaCross;

fn windows(config: &IndicatorConfig) -> Result<(usize, usize), ScanError> {
    let short = config.window("short_window")?;
    let long = config.window("long_window")?;
    if short >= long {
        return Err(config.inconsistent(
            "short_window",
            format!("must be below long_window ({} >= {})", short, long),
        ));
    }
    Ok((short, long))
}

fn metric_names(short: usize, long: usize) -> [String; 4] {
    [
        format!("ema_{}", short),
        format!("ema_{}", long),
        "ema_spread".to_string(),
        "ema_short_above_long".to_string(),
    ]
}

impl Indicator for EmaCross {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        let (_, long) = windows(config)?;
        Ok(long + 1)
    }

    fn compute(
        &self,
        series: &TimeSeries,
        column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let (short, long) = windows(config)?;
        let names = metric_names(short, long);

        let prices = match series.column(column) {
            Some(p) if p.len() >= self.min_history(config)? => p,
            _ => return Ok(IndicatorReading::neutral(names)),
        };

        let ema_short = ema(&prices, short);
        let ema_long = ema(&prices, long);
        let short_now = last(&ema_short);
        let long_now = last(&ema_long);

        let score = if crossed_above_last(&ema_short, &ema_long) {
            1.0
        } else if crossed_below_last(&ema_short, &ema_long) {
            -1.0
        } else {
            0.0
        };

        let [short_name, long_name, spread_name, above_name] = names;
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert(short_name, short_now);
        snapshot.insert(long_name, long_now);
        snapshot.insert(spread_name, short_now.zip(long_now).map(|(s, l)| s - l));
        snapshot.insert(
            above_name,
            short_now.zip(long_now).and_then(|(s, l)| flag(s > l)),
        );

        Ok(IndicatorReading::new(snapshot, score))
    }

    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String> {
        let Ok((short, long)) = windows(config) else {
            return Vec::new();
        };
        let short_val = show(reading.metric(&format!("ema_{}", short)));
        let long_val = show(reading.metric(&format!("ema_{}", long)));

        let line = if reading.score > 0.0 {
            format!(
                "EMA{} ({}) crossed above EMA{} ({}) on the latest bar",
                short, short_val, long, long_val
            )
        } else if reading.score < 0.0 {
            format!(
                "EMA{} ({}) crossed below EMA{} ({}) on the latest bar",
                short, short_val, long, long_val
            )
        } else {
            let side = if reading.flag("ema_short_above_long") {
                "above"
            } else {
                "below"
            };
            format!(
                "EMA{} ({}) is {} EMA{} ({}) with no crossover on the latest bar",
                short, short_val, side, long, long_val
            )
        };
        vec![line]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::testing::closes;

    fn config(short: f64, long: f64) -> IndicatorConfig {
        schema()
            .resolve(
                ID,
                &IndicatorConfig::new()
                    .with("short_window", short)
                    .with("long_window", long),
            )
            .unwrap()
    }

    /// Flat at 100 for 55 bars, then rising one point per bar.
    fn breakout_prices() -> Vec<f64> {
        (0..60)
            .map(|i| if i < 55 { 100.0 } else { 100.0 + (i - 54) as f64 })
            .collect()
    }

    #[test]
    fn crossover_fires_only_on_breakout_bar() {
        let prices = breakout_prices();
        let cfg = config(20.0, 50.0);
        for t in 0..60 {
            let reading = EmaCross
                .compute(&closes(&prices[..=t]), PriceColumn::Close, &cfg)
                .unwrap();
            let expected = if t == 55 { 1.0 } else { 0.0 };
            assert_eq!(reading.score, expected, "bar {}", t);
        }
    }

    #[test]
    fn crossover_below_scores_minus_one() {
        let prices: Vec<f64> = (0..60)
            .map(|i| if i < 55 { 100.0 } else { 100.0 - (i - 54) as f64 })
            .collect();
        let series = closes(&prices[..56]);
        let reading = EmaCross
            .compute(&series, PriceColumn::Close, &config(20.0, 50.0))
            .unwrap();
        assert_eq!(reading.score, -1.0);
        assert!(reading.metric("ema_spread").unwrap() < 0.0);
    }

    #[test]
    fn short_history_is_neutral_with_markers() {
        let series = closes(&[100.0; 30]);
        let reading = EmaCross
            .compute(&series, PriceColumn::Close, &config(20.0, 50.0))
            .unwrap();
        assert_eq!(reading.score, 0.0);
        assert!(reading.snapshot.contains_key("ema_20"));
        assert_eq!(reading.metric("ema_20"), None);
    }

    #[test]
    fn missing_column_is_neutral() {
        let series = closes(&breakout_prices());
        let reading = EmaCross
            .compute(&series, PriceColumn::Volume, &config(20.0, 50.0))
            .unwrap();
        assert_eq!(reading.score, 0.0);
    }

    #[test]
    fn short_window_must_be_below_long() {
        let series = closes(&breakout_prices());
        let err = EmaCross
            .compute(&series, PriceColumn::Close, &config(50.0, 20.0))
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidParam { .. }));
    }

    #[test]
    fn min_history_needs_previous_bar() {
        assert_eq!(EmaCross.min_history(&config(20.0, 50.0)).unwrap(), 51);
    }

    #[test]
    fn explain_mentions_cross() {
        let series = closes(&breakout_prices()[..56]);
        let cfg = config(20.0, 50.0);
        let reading = EmaCross.compute(&series, PriceColumn::Close, &cfg).unwrap();
        let lines = EmaCross.explain(&reading, &cfg);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("EMA20"));
        assert!(lines[0].contains("crossed above EMA50"));
    }
}
