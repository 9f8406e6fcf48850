//! Price momentum indicator.
//!
//! Main signal: direction of the change over `lookback` bars, scaled by
//! min(1, |pct change| / 10%). Daily signal: direction of the change over
//! `daily_lookback` bars. The two blend by `daily_weight`.

use crate::domain::error::ScanError;
use crate::domain::indicator::math::pct_change;
use crate::domain::indicator::{
    show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "momentum";

/// Percentage move that earns full main-signal conviction.
const FULL_SCALE_PCT: f64 = 10.0;

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "Momentum",
        description: "Rate of change over a lookback, blended with the latest daily move",
        params: vec![
            ParamSpec::window("lookback", 20, "Bars for the main change"),
            ParamSpec::window("daily_lookback", 1, "Bars for the daily change"),
            ParamSpec::real(
                "daily_weight",
                0.3,
                0.0,
                Some(1.0),
                "Share of the score given to the daily change",
            ),
        ],
    }
}

pub struct Momentum;

fn direction(pct: f64) -> f64 {
    if pct > 0.0 {
        1.0
    } else if pct < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Change in percent between `prices[len-1-bars]` and the latest price.
fn change_over(prices: &[f64], bars: usize) -> Option<f64> {
    let now = *prices.last()?;
    let then = *prices.get(prices.len().checked_sub(bars + 1)?)?;
    pct_change(then, now)
}

impl Indicator for Momentum {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        Ok(config.window("lookback")?.max(config.window("daily_lookback")?) + 1)
    }

    fn compute(
        &self,
        series: &TimeSeries,
        column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let lookback = config.window("lookback")?;
        let daily_lookback = config.window("daily_lookback")?;
        let daily_weight = config.get("daily_weight")?;
        let name = format!("momentum_{}", lookback);

        let prices = match series.column(column) {
            Some(p) if p.len() >= self.min_history(config)? => p,
            _ => return Ok(IndicatorReading::neutral([name, "momentum_daily".to_string()])),
        };

        let main_pct = change_over(&prices, lookback);
        let daily_pct = change_over(&prices, daily_lookback);

        let main = main_pct.map_or(0.0, |p| direction(p) * (p.abs() / FULL_SCALE_PCT).min(1.0));
        let daily = daily_pct.map_or(0.0, direction);
        let score = (1.0 - daily_weight) * main + daily_weight * daily;

        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert(name, main_pct);
        snapshot.insert("momentum_daily".into(), daily_pct);
        Ok(IndicatorReading::new(snapshot, score))
    }

    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String> {
        let Ok(lookback) = config.window("lookback") else {
            return Vec::new();
        };
        vec![format!(
            "Price changed {}% over {} bars, {}% on the latest move",
            show(reading.metric(&format!("momentum_{}", lookback))),
            lookback,
            show(reading.metric("momentum_daily"))
        )]
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
    fn strong_rally_scores_full() {
        // +20% over 20 bars, still rising on the last bar
        let prices: Vec<f64> = (0..21).map(|i| 100.0 + i as f64).collect();
        let reading = Momentum
            .compute(&closes(&prices), PriceColumn::Close, &defaults())
            .unwrap();
        assert_relative_eq!(reading.metric("momentum_20").unwrap(), 20.0);
        assert_relative_eq!(reading.score, 1.0);
    }

    #[test]
    fn modest_gain_with_down_day_blends() {
        // +5% over 20 bars, last bar down
        let mut prices = vec![100.0; 21];
        prices[19] = 106.0;
        prices[20] = 105.0;
        let reading = Momentum
            .compute(&closes(&prices), PriceColumn::Close, &defaults())
            .unwrap();
        // 0.7 * 0.5 + 0.3 * -1
        assert_relative_eq!(reading.score, 0.05, epsilon = 1e-12);
        assert!(reading.metric("momentum_daily").unwrap() < 0.0);
    }

    #[test]
    fn falling_prices_score_negative() {
        let prices: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let reading = Momentum
            .compute(&closes(&prices), PriceColumn::Close, &defaults())
            .unwrap();
        assert!(reading.score < 0.0);
    }

    #[test]
    fn flat_prices_are_neutral() {
        let reading = Momentum
            .compute(&closes(&[100.0; 30]), PriceColumn::Close, &defaults())
            .unwrap();
        assert_eq!(reading.score, 0.0);
    }

    #[test]
    fn short_history_is_neutral() {
        let reading = Momentum
            .compute(&closes(&[100.0; 20]), PriceColumn::Close, &defaults())
            .unwrap();
        assert_eq!(reading.snapshot.get("momentum_20"), Some(&None));
        assert_eq!(Momentum.min_history(&defaults()).unwrap(), 21);
    }

    #[test]
    fn zero_base_price_has_no_change() {
        let mut prices = vec![100.0; 21];
        prices[0] = 0.0;
        let reading = Momentum
            .compute(&closes(&prices), PriceColumn::Close, &defaults())
            .unwrap();
        assert_eq!(reading.metric("momentum_20"), None);
    }
}
