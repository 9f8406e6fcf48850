//! Volume confirmation indicator.
//!
//! ratio = latest volume / SMA(volume, window)
//! - ratio >= min_multiplier: confirmed, +min(1, ratio / multiplier - 0.5)
//! - otherwise: -(1 - ratio / multiplier) * 0.5
//!
//! Mutual fund NAV feeds carry no volume; such series stay neutral.

use crate::domain::error::ScanError;
use crate::domain::indicator::math::{last, sma};
use crate::domain::indicator::{
    flag, show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "volume";

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "Volume",
        description: "Latest volume against its moving average",
        params: vec![
            ParamSpec::window("window", 20, "Volume SMA length"),
            ParamSpec::real(
                "min_multiplier",
                1.5,
                f64::MIN_POSITIVE,
                None,
                "Ratio required to confirm",
            ),
        ],
    }
}

pub struct Volume;

/// Score for a volume ratio against the confirmation multiplier.
pub fn ratio_score(ratio: f64, multiplier: f64) -> f64 {
    let relative = ratio / multiplier;
    if ratio >= multiplier {
        (relative - 1.0 + 0.5).min(1.0)
    } else {
        -(1.0 - relative) * 0.5
    }
}

fn metric_names(window: usize) -> [String; 4] {
    [
        "volume".to_string(),
        format!("volume_sma_{}", window),
        "volume_ratio".to_string(),
        "volume_confirmed".to_string(),
    ]
}

impl Indicator for Volume {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        config.window("window")
    }

    fn compute(
        &self,
        series: &TimeSeries,
        _column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let window = config.window("window")?;
        let multiplier = config.get("min_multiplier")?;

        if series.len() < window {
            return Ok(IndicatorReading::neutral(metric_names(window)));
        }
        let Some(volumes) = series.volumes() else {
            return Ok(IndicatorReading::new(IndicatorSnapshot::new(), 0.0));
        };

        let [volume_name, sma_name, ratio_name, confirmed_name] = metric_names(window);
        let current = volumes.last().copied();
        let average = last(&sma(&volumes, window));
        let ratio = current
            .zip(average)
            .filter(|&(_, avg)| avg > 0.0)
            .map(|(v, avg)| v / avg);

        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert(volume_name, current);
        snapshot.insert(sma_name, average);
        snapshot.insert(ratio_name, ratio);
        snapshot.insert(confirmed_name, ratio.and_then(|r| flag(r >= multiplier)));

        let score = ratio.map_or(0.0, |r| ratio_score(r, multiplier));
        Ok(IndicatorReading::new(snapshot, score))
    }

    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String> {
        if !reading.snapshot.contains_key("volume_ratio") {
            return vec!["Volume unavailable for this instrument".to_string()];
        }
        let multiplier = config.get("min_multiplier").unwrap_or(1.5);
        let verdict = if reading.flag("volume_confirmed") {
            "confirms the move"
        } else {
            "below confirmation"
        };
        vec![format!(
            "Volume at {}x average {} (needs {:.2}x)",
            show(reading.metric("volume_ratio")),
            verdict,
            multiplier
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::testing::{closes, day};
    use crate::domain::ohlcv::OhlcvBar;
    use approx::assert_relative_eq;

    fn defaults() -> IndicatorConfig {
        schema().defaults(ID)
    }

    fn with_volumes(volumes: &[f64]) -> TimeSeries {
        let bars = volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| OhlcvBar {
                volume: Some(v),
                ..OhlcvBar::close_only(day(i), 100.0)
            })
            .collect();
        TimeSeries::new(bars).unwrap()
    }

    #[test]
    fn ratio_score_mapping() {
        assert_relative_eq!(ratio_score(1.5, 1.5), 0.5);
        assert_relative_eq!(ratio_score(3.0, 1.5), 1.0);
        assert_relative_eq!(ratio_score(4.5, 1.5), 1.0);
        assert_relative_eq!(ratio_score(0.75, 1.5), -0.25);
        assert_relative_eq!(ratio_score(0.0, 1.5), -0.5);
    }

    #[test]
    fn surge_confirms() {
        let mut volumes = vec![1000.0; 19];
        volumes.push(5000.0);
        let reading = Volume
            .compute(&with_volumes(&volumes), PriceColumn::Close, &defaults())
            .unwrap();
        // SMA = (19000 + 5000) / 20 = 1200, ratio = 4.1667
        assert_relative_eq!(reading.metric("volume_sma_20").unwrap(), 1200.0);
        assert!(reading.flag("volume_confirmed"));
        assert_relative_eq!(reading.score, 1.0);
    }

    #[test]
    fn quiet_volume_scores_negative() {
        let mut volumes = vec![1000.0; 19];
        volumes.push(100.0);
        let reading = Volume
            .compute(&with_volumes(&volumes), PriceColumn::Close, &defaults())
            .unwrap();
        assert!(!reading.flag("volume_confirmed"));
        assert!(reading.score < 0.0 && reading.score >= -0.5);
    }

    #[test]
    fn missing_volume_is_neutral() {
        let reading = Volume
            .compute(&closes(&[100.0; 30]), PriceColumn::Close, &defaults())
            .unwrap();
        assert_eq!(reading.score, 0.0);
        assert!(reading.snapshot.is_empty());
        assert!(Volume.explain(&reading, &defaults())[0].contains("unavailable"));
    }

    #[test]
    fn zero_average_is_neutral() {
        let reading = Volume
            .compute(&with_volumes(&[0.0; 20]), PriceColumn::Close, &defaults())
            .unwrap();
        assert_eq!(reading.score, 0.0);
        assert_eq!(reading.metric("volume_ratio"), None);
    }
}
