//! ADX (Average Directional Index) indicator.
//!
//! Measures trend strength, not direction:
//! - +DM / -DM from consecutive highs and lows
//! - +DI / -DI = Wilder-smoothed DM over Wilder-smoothed TR, × 100
//! - DX = |+DI - -DI| / (+DI + -DI) × 100, ADX = Wilder-smoothed DX
//!
//! The score is always 0. The scanner can use `adx` against
//! `trend_threshold` to damp directional scores in ranging markets.

use crate::domain::error::ScanError;
use crate::domain::indicator::math::{last, wilder};
use crate::domain::indicator::{
    flag, show, Indicator, IndicatorConfig, IndicatorReading, IndicatorSchema, IndicatorSnapshot,
    ParamSpec,
};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};

pub const ID: &str = "adx";

const METRICS: [&str; 4] = ["adx", "plus_di", "minus_di", "trending"];

pub fn schema() -> IndicatorSchema {
    IndicatorSchema {
        label: "ADX",
        description: "Trend strength; informs confidence, never direction",
        params: vec![
            ParamSpec::window("window", 14, "Wilder smoothing length"),
            ParamSpec::real(
                "trend_threshold",
                25.0,
                0.0,
                Some(100.0),
                "ADX level above which the market is trending",
            ),
        ],
    }
}

pub struct Adx;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalIndex {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Latest ADX with its directional indicators, or `None` when the series is
/// too short or lacks high/low.
pub fn directional_index(series: &TimeSeries, period: usize) -> Option<DirectionalIndex> {
    let highs = series.highs()?;
    let lows = series.lows()?;
    let ranges = series.true_ranges()?;
    if period == 0 || highs.len() < 2 {
        return None;
    }

    let mut plus_dm = Vec::with_capacity(highs.len() - 1);
    let mut minus_dm = Vec::with_capacity(highs.len() - 1);
    for i in 1..highs.len() {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];
        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
    }

    let smoothed_plus = wilder(&plus_dm, period);
    let smoothed_minus = wilder(&minus_dm, period);
    let smoothed_tr = wilder(&ranges[1..], period);

    let mut dx = Vec::new();
    let mut latest = (0.0, 0.0);
    for i in 0..smoothed_tr.len() {
        let (Some(p), Some(m), Some(tr)) = (smoothed_plus[i], smoothed_minus[i], smoothed_tr[i])
        else {
            continue;
        };
        let (plus_di, minus_di) = if tr > 0.0 {
            (p / tr * 100.0, m / tr * 100.0)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        dx.push(if di_sum > 0.0 {
            (plus_di - minus_di).abs() / di_sum * 100.0
        } else {
            0.0
        });
        latest = (plus_di, minus_di);
    }

    let adx = last(&wilder(&dx, period))?;
    Some(DirectionalIndex {
        adx,
        plus_di: latest.0,
        minus_di: latest.1,
    })
}

impl Indicator for Adx {
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError> {
        Ok(config.window("window")? * 2)
    }

    fn compute(
        &self,
        series: &TimeSeries,
        _column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError> {
        let window = config.window("window")?;
        let threshold = config.get("trend_threshold")?;

        if series.len() < self.min_history(config)? {
            return Ok(IndicatorReading::neutral(METRICS));
        }
        let Some(di) = directional_index(series, window) else {
            return Ok(IndicatorReading::new(IndicatorSnapshot::new(), 0.0));
        };

        let mut snapshot = IndicatorSnapshot::new();
        snapshot.insert("adx".into(), Some(di.adx));
        snapshot.insert("plus_di".into(), Some(di.plus_di));
        snapshot.insert("minus_di".into(), Some(di.minus_di));
        snapshot.insert("trending".into(), flag(di.adx >= threshold));
        Ok(IndicatorReading::new(snapshot, 0.0))
    }

    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String> {
        if !reading.snapshot.contains_key("adx") {
            return vec!["ADX unavailable without high/low data".to_string()];
        }
        let threshold = config.get("trend_threshold").unwrap_or(25.0);
        let state = if reading.flag("trending") {
            "trending"
        } else {
            "ranging"
        };
        vec![format!(
            "ADX {} (+DI {}, -DI {}): {} against threshold {:.0}",
            show(reading.metric("adx")),
            show(reading.metric("plus_di")),
            show(reading.metric("minus_di")),
            state,
            threshold
        )]
    }
}
