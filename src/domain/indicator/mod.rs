//! Indicator contract, parameter schemas and the built-in indicators.
//!
//! - `Indicator`: stateless transform of a series + parameters into a reading
//! - `IndicatorConfig`: parameter name → value, resolved against a schema
//! - `IndicatorSchema` / `ParamSpec`: self-description used for validation
//!   and for callers building configuration forms
//! - `IndicatorReading`: the snapshot of latest raw metrics plus a signed score

pub mod adx;
pub mod atr;
pub mod cross;
pub mod ema_cross;
pub mod ema_regime;
pub mod macd;
pub mod math;
pub mod momentum;
pub mod rsi;
pub mod stochastic;
pub mod volume;

use crate::domain::error::ScanError;
use crate::domain::ohlcv::{PriceColumn, TimeSeries};
use serde_json::{json, Value};
use std::any::TypeId;
use std::collections::BTreeMap;

/// Largest accepted window length. Keeps history arithmetic far from overflow.
pub const MAX_WINDOW: usize = 10_000;

/// Latest metric values for one indicator on one instrument.
/// `None` marks a metric that could not be computed.
pub type IndicatorSnapshot = BTreeMap<String, Option<f64>>;

/// Output of one indicator computation.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorReading {
    pub snapshot: IndicatorSnapshot,
    /// Signed conviction in [-1, 1]; positive is bullish.
    pub score: f64,
}

impl IndicatorReading {
    pub fn new(snapshot: IndicatorSnapshot, score: f64) -> Self {
        if !score.is_finite() {
            tracing::warn!(score, "non-finite indicator score treated as neutral");
        }
        Self {
            snapshot,
            score: math::clamp_score(score),
        }
    }

    /// Neutral reading with every listed metric marked unavailable.
    pub fn neutral<I, S>(metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            snapshot: metrics.into_iter().map(|m| (m.into(), None)).collect(),
            score: 0.0,
        }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.snapshot.get(name).copied().flatten()
    }

    pub fn flag(&self, name: &str) -> bool {
        self.metric(name).is_some_and(|v| v > 0.5)
    }
}

/// Encode a boolean condition as a snapshot value.
pub fn flag(value: bool) -> Option<f64> {
    Some(if value { 1.0 } else { 0.0 })
}

/// Render a metric for explanation text.
pub fn show(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

/// Technical indicator plugged into the registry.
///
/// Implementations hold no state: everything comes from the series and the
/// resolved configuration, so the same input always yields the same reading.
pub trait Indicator: Send + Sync + 'static {
    /// Bars required before the indicator can say anything.
    fn min_history(&self, config: &IndicatorConfig) -> Result<usize, ScanError>;

    /// Compute the reading for the latest bar of `series`.
    ///
    /// `column` is the configured price column for single-series
    /// indicators. Indicators built on bar ranges (stochastic, ATR, ADX,
    /// volume) read high/low/close or volume directly and ignore it.
    ///
    /// Short history or missing optional columns yield a neutral reading.
    /// Errors are reserved for inconsistent configuration.
    fn compute(
        &self,
        series: &TimeSeries,
        column: PriceColumn,
        config: &IndicatorConfig,
    ) -> Result<IndicatorReading, ScanError>;

    /// Human-readable lines describing a reading computed with `config`.
    fn explain(&self, reading: &IndicatorReading, config: &IndicatorConfig) -> Vec<String>;

    /// Identity of the concrete implementation.
    fn implementation_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Real,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Real => "real",
        }
    }
}

/// Declared parameter of an indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: f64,
    pub min: f64,
    pub max: Option<f64>,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn window(name: &'static str, default: usize, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Integer,
            default: default as f64,
            min: 1.0,
            max: Some(MAX_WINDOW as f64),
            description,
        }
    }

    pub fn real(
        name: &'static str,
        default: f64,
        min: f64,
        max: Option<f64>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Real,
            default,
            min,
            max,
            description,
        }
    }

    fn check(&self, indicator: &str, value: f64) -> Result<(), ScanError> {
        if !value.is_finite() {
            return Err(ScanError::invalid_param(indicator, self.name, "must be finite"));
        }
        if self.kind == ParamKind::Integer && value.fract() != 0.0 {
            return Err(ScanError::invalid_param(
                indicator,
                self.name,
                format!("must be an integer, got {}", value),
            ));
        }
        if value < self.min {
            return Err(ScanError::invalid_param(
                indicator,
                self.name,
                format!("must be at least {}, got {}", self.min, value),
            ));
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ScanError::invalid_param(
                    indicator,
                    self.name,
                    format!("must be at most {}, got {}", max, value),
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "type": self.kind.as_str(),
            "default": self.default,
            "min": self.min,
            "max": self.max,
            "description": self.description,
        })
    }
}

/// Self-description of an indicator: label plus parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSchema {
    pub label: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl IndicatorSchema {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Fill defaults, reject unknown names and check kinds and ranges.
    pub fn resolve(
        &self,
        indicator: &str,
        config: &IndicatorConfig,
    ) -> Result<IndicatorConfig, ScanError> {
        if let Some(unknown) = config.values.keys().find(|k| self.param(k).is_none()) {
            return Err(ScanError::UnknownParam {
                indicator: indicator.to_string(),
                param: unknown.clone(),
            });
        }

        let mut resolved = IndicatorConfig {
            indicator: indicator.to_string(),
            values: BTreeMap::new(),
        };
        for param in &self.params {
            let value = config.values.get(param.name).copied().unwrap_or(param.default);
            param.check(indicator, value)?;
            resolved.values.insert(param.name.to_string(), value);
        }
        Ok(resolved)
    }

    /// Configuration holding every default.
    pub fn defaults(&self, indicator: &str) -> IndicatorConfig {
        IndicatorConfig {
            indicator: indicator.to_string(),
            values: self
                .params
                .iter()
                .map(|p| (p.name.to_string(), p.default))
                .collect(),
        }
    }

    pub fn to_json(&self, id: &str) -> Value {
        json!({
            "id": id,
            "label": self.label,
            "description": self.description,
            "params": self.params.iter().map(ParamSpec::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Parameter values for one indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorConfig {
    indicator: String,
    values: BTreeMap<String, f64>,
}

impl IndicatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<f64, ScanError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| ScanError::invalid_param(&self.indicator, name, "not set"))
    }

    /// Integer window parameter in `1..=MAX_WINDOW`.
    pub fn window(&self, name: &str) -> Result<usize, ScanError> {
        let value = self.get(name)?;
        if value < 1.0 || value.fract() != 0.0 || value > MAX_WINDOW as f64 {
            return Err(ScanError::invalid_param(
                &self.indicator,
                name,
                format!(
                    "window must be an integer in 1..={}, got {}",
                    MAX_WINDOW, value
                ),
            ));
        }
        Ok(value as usize)
    }

    /// Error for parameters that are individually valid but inconsistent.
    pub fn inconsistent(&self, name: &str, reason: impl Into<String>) -> ScanError {
        ScanError::invalid_param(&self.indicator, name, reason)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::domain::ohlcv::{OhlcvBar, TimeSeries};
    use chrono::{Duration, NaiveDate};

    pub fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
    }

    /// Close-only series, as a fund NAV feed would deliver.
    pub fn closes(prices: &[f64]) -> TimeSeries {
        let bars = prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar::close_only(day(i), close))
            .collect();
        TimeSeries::new(bars).unwrap()
    }

    /// Full OHLCV series with a fixed range of `spread` around each close.
    pub fn ohlcv(prices: &[f64], spread: f64, volume: f64) -> TimeSeries {
        let bars = prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: day(i),
                open: Some(close),
                high: Some(close + spread),
                low: Some(close - spread),
                close,
                volume: Some(volume),
            })
            .collect();
        TimeSeries::new(bars).unwrap()
    }

    /// Bars with explicit high/low/close triples.
    pub fn hlc(rows: &[(f64, f64, f64)]) -> TimeSeries {
        let bars = rows
            .iter()
            .enumerate()
            .map(|(i, &(high, low, close))| OhlcvBar {
                date: day(i),
                open: Some(close),
                high: Some(high),
                low: Some(low),
                close,
                volume: Some(1000.0),
            })
            .collect();
        TimeSeries::new(bars).unwrap()
    }
}
