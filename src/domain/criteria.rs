//! Scan criteria: per-indicator weights and parameters plus thresholds.
//!
//! Criteria are plain data. Nothing is checked against the registry until
//! [`ScanCriteria::resolve`], which the scanner calls before touching any
//! instrument.

use crate::domain::config_validation::{
    parse_bool, parse_real, validate_scan_config, INDICATOR_SECTION_PREFIX, SCAN_SECTION,
    WEIGHTS_SECTION,
};
use crate::domain::error::ScanError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::ohlcv::PriceColumn;
use crate::domain::registry::IndicatorRegistry;
use crate::ports::config_port::ConfigPort;
use serde::Deserialize;
use std::collections::BTreeMap;

pub const DEFAULT_BUY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_SELL_THRESHOLD: f64 = 0.5;
pub const DEFAULT_PRICE_COLUMN: &str = "close";

/// Immutable configuration for one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanCriteria {
    weights: BTreeMap<String, f64>,
    params: BTreeMap<String, IndicatorConfig>,
    buy_threshold: f64,
    /// Magnitude: SELL when composite <= -sell_threshold.
    sell_threshold: f64,
    price_column: String,
    adx_scaling: bool,
}

impl Default for ScanCriteria {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            params: BTreeMap::new(),
            buy_threshold: DEFAULT_BUY_THRESHOLD,
            sell_threshold: DEFAULT_SELL_THRESHOLD,
            price_column: DEFAULT_PRICE_COLUMN.to_string(),
            adx_scaling: false,
        }
    }
}

/// Indicator configurations after resolution against the registry schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCriteria {
    /// Every id named by the criteria, keyed in id order.
    pub configs: BTreeMap<String, IndicatorConfig>,
    pub price_column: PriceColumn,
}

impl ScanCriteria {
    pub fn builder() -> ScanCriteriaBuilder {
        ScanCriteriaBuilder::default()
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    pub fn weight(&self, id: &str) -> f64 {
        self.weights.get(id).copied().unwrap_or(0.0)
    }

    /// (id, weight) for every non-zero weight, in id order.
    pub fn enabled(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights
            .iter()
            .filter(|&(_, &w)| w != 0.0)
            .map(|(id, &w)| (id.as_str(), w))
    }

    pub fn params(&self, id: &str) -> Option<&IndicatorConfig> {
        self.params.get(id)
    }

    pub fn buy_threshold(&self) -> f64 {
        self.buy_threshold
    }

    pub fn sell_threshold(&self) -> f64 {
        self.sell_threshold
    }

    pub fn price_column(&self) -> &str {
        &self.price_column
    }

    pub fn adx_scaling(&self) -> bool {
        self.adx_scaling
    }

    /// Check every referenced id against `registry` and resolve its
    /// parameters, filling schema defaults.
    pub fn resolve(&self, registry: &IndicatorRegistry) -> Result<ResolvedCriteria, ScanError> {
        let price_column: PriceColumn = self.price_column.parse()?;

        let mut configs = BTreeMap::new();
        let ids = self.weights.keys().chain(self.params.keys());
        for id in ids {
            if configs.contains_key(id) {
                continue;
            }
            let entry = registry.get(id)?;
            let raw = self.params.get(id).cloned().unwrap_or_default();
            let resolved = entry.schema.resolve(id, &raw)?;
            entry.indicator.min_history(&resolved)?;
            configs.insert(id.clone(), resolved);
        }
        Ok(ResolvedCriteria {
            configs,
            price_column,
        })
    }

    /// Criteria from INI configuration: `[scan]` thresholds and column,
    /// `[weights]`, and one `[indicator.<id>]` section per parameter set.
    pub fn from_config(
        config: &dyn ConfigPort,
        registry: &IndicatorRegistry,
    ) -> Result<Self, ScanError> {
        validate_scan_config(config)?;

        let mut builder = Self::builder();
        if let Some(v) = parse_real(config, SCAN_SECTION, "buy_threshold")? {
            builder = builder.buy_threshold(v);
        }
        if let Some(v) = parse_real(config, SCAN_SECTION, "sell_threshold")? {
            builder = builder.sell_threshold(v);
        }
        if let Some(column) = config.get_string(SCAN_SECTION, "price_column") {
            builder = builder.price_column(column.trim());
        }
        if let Some(flag) = parse_bool(config, SCAN_SECTION, "adx_scaling")? {
            builder = builder.adx_scaling(flag);
        }

        for id in config.keys(WEIGHTS_SECTION) {
            if let Some(w) = parse_real(config, WEIGHTS_SECTION, &id)? {
                builder = builder.weight(&id, w);
            }
        }

        for section in config.sections() {
            let Some(id) = section.strip_prefix(INDICATOR_SECTION_PREFIX) else {
                continue;
            };
            let mut params = IndicatorConfig::new();
            for key in config.keys(&section) {
                if let Some(v) = parse_real(config, &section, &key)? {
                    params.set(&key, v);
                }
            }
            builder = builder.params(id, params);
        }

        let criteria = builder.build()?;
        criteria.resolve(registry)?;
        Ok(criteria)
    }

    /// Criteria from a JSON request payload:
    ///
    /// ```json
    /// {"weights": {"rsi": 1.0}, "params": {"rsi": {"window": 10}},
    ///  "buy_threshold": 0.5, "sell_threshold": 0.5,
    ///  "price_column": "close", "adx_scaling": false}
    /// ```
    ///
    /// Every field is optional. Registry checks happen in [`Self::resolve`].
    pub fn from_json_str(json: &str) -> Result<Self, ScanError> {
        let payload: CriteriaPayload = serde_json::from_str(json)?;
        let mut builder = Self::builder().adx_scaling(payload.adx_scaling);
        if let Some(v) = payload.buy_threshold {
            builder = builder.buy_threshold(v);
        }
        if let Some(v) = payload.sell_threshold {
            builder = builder.sell_threshold(v);
        }
        if let Some(column) = payload.price_column {
            builder = builder.price_column(&column);
        }
        for (id, w) in payload.weights {
            builder = builder.weight(&id, w);
        }
        for (id, values) in payload.params {
            let params = values
                .into_iter()
                .fold(IndicatorConfig::new(), |cfg, (k, v)| cfg.with(&k, v));
            builder = builder.params(&id, params);
        }
        builder.build()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CriteriaPayload {
    #[serde(default)]
    weights: BTreeMap<String, f64>,
    #[serde(default)]
    params: BTreeMap<String, BTreeMap<String, f64>>,
    buy_threshold: Option<f64>,
    sell_threshold: Option<f64>,
    price_column: Option<String>,
    #[serde(default)]
    adx_scaling: bool,
}

#[derive(Debug, Default)]
pub struct ScanCriteriaBuilder {
    criteria: ScanCriteria,
}

impl ScanCriteriaBuilder {
    pub fn weight(mut self, id: &str, weight: f64) -> Self {
        self.criteria.weights.insert(id.to_string(), weight);
        self
    }

    /// Set one parameter of `id`, keeping any others already given.
    pub fn param(mut self, id: &str, name: &str, value: f64) -> Self {
        self.criteria
            .params
            .entry(id.to_string())
            .or_default()
            .set(name, value);
        self
    }

    /// Replace all parameters of `id`.
    pub fn params(mut self, id: &str, params: IndicatorConfig) -> Self {
        self.criteria.params.insert(id.to_string(), params);
        self
    }

    pub fn buy_threshold(mut self, value: f64) -> Self {
        self.criteria.buy_threshold = value;
        self
    }

    pub fn sell_threshold(mut self, value: f64) -> Self {
        self.criteria.sell_threshold = value;
        self
    }

    /// Same value for both thresholds.
    pub fn threshold(self, value: f64) -> Self {
        self.buy_threshold(value).sell_threshold(value)
    }

    pub fn price_column(mut self, column: &str) -> Self {
        self.criteria.price_column = column.to_string();
        self
    }

    pub fn adx_scaling(mut self, enabled: bool) -> Self {
        self.criteria.adx_scaling = enabled;
        self
    }

    /// Finish, rejecting non-finite thresholds or weights.
    pub fn build(self) -> Result<ScanCriteria, ScanError> {
        let c = self.criteria;
        for (key, value) in [
            ("buy_threshold", c.buy_threshold),
            ("sell_threshold", c.sell_threshold),
        ] {
            if !value.is_finite() {
                return Err(ScanError::config_invalid(SCAN_SECTION, key, "must be finite"));
            }
        }
        if let Some((id, _)) = c.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(ScanError::config_invalid(
                WEIGHTS_SECTION,
                id.as_str(),
                "must be finite",
            ));
        }
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::error::RegistryError;
    use crate::domain::registry::default_registry;

    #[test]
    fn defaults() {
        let c = ScanCriteria::builder().build().unwrap();
        assert_eq!(c.buy_threshold(), DEFAULT_BUY_THRESHOLD);
        assert_eq!(c.sell_threshold(), DEFAULT_SELL_THRESHOLD);
        assert_eq!(c.price_column(), "close");
        assert!(!c.adx_scaling());
        assert_eq!(c.enabled().count(), 0);
    }

    #[test]
    fn enabled_skips_zero_weights_in_id_order() {
        let c = ScanCriteria::builder()
            .weight("rsi", 0.5)
            .weight("macd", 0.0)
            .weight("ema_cross", 1.0)
            .build()
            .unwrap();
        let ids: Vec<&str> = c.enabled().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["ema_cross", "rsi"]);
        assert_eq!(c.weight("macd"), 0.0);
        assert_eq!(c.weight("volume"), 0.0);
    }

    #[test]
    fn param_accumulates() {
        let c = ScanCriteria::builder()
            .param("rsi", "window", 10.0)
            .param("rsi", "lower", 25.0)
            .build()
            .unwrap();
        let params = c.params("rsi").unwrap();
        assert_eq!(params.values().len(), 2);
    }

    #[test]
    fn non_finite_weight_rejected() {
        let err = ScanCriteria::builder()
            .weight("rsi", f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, ScanError::ConfigInvalid { key, .. } if key == "rsi"));
    }

    #[test]
    fn resolve_fills_defaults_for_weighted_ids() {
        let c = ScanCriteria::builder()
            .weight("rsi", 1.0)
            .param("macd", "fast", 5.0)
            .build()
            .unwrap();
        let resolved = c.resolve(default_registry()).unwrap();
        assert_eq!(resolved.configs["rsi"].window("window").unwrap(), 14);
        assert_eq!(resolved.configs["macd"].window("fast").unwrap(), 5);
        assert_eq!(resolved.price_column, PriceColumn::Close);
    }

    #[test]
    fn resolve_rejects_unknown_weight_id() {
        let c = ScanCriteria::builder().weight("bogus", 1.0).build().unwrap();
        let err = c.resolve(default_registry()).unwrap_err();
        assert!(matches!(
            err,
            ScanError::Registry(RegistryError::UnknownIndicator(id)) if id == "bogus"
        ));
    }

    #[test]
    fn resolve_rejects_unknown_param_id_even_without_weight() {
        let c = ScanCriteria::builder()
            .param("bogus", "window", 3.0)
            .build()
            .unwrap();
        assert!(c.resolve(default_registry()).is_err());
    }

    #[test]
    fn resolve_rejects_inconsistent_windows() {
        let c = ScanCriteria::builder()
            .weight("ema_cross", 1.0)
            .param("ema_cross", "short_window", 60.0)
            .build()
            .unwrap();
        assert!(matches!(
            c.resolve(default_registry()),
            Err(ScanError::InvalidParam { .. })
        ));
    }

    #[test]
    fn resolve_rejects_unknown_column() {
        let c = ScanCriteria::builder().price_column("nav").build().unwrap();
        assert!(matches!(
            c.resolve(default_registry()),
            Err(ScanError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn from_config_reads_all_sections() {
        let config = FileConfigAdapter::from_string(
            r#"
[scan]
buy_threshold = 0.7
sell_threshold = 0.3
price_column = price
adx_scaling = yes

[weights]
ema_cross = 1.0
rsi = 0.5

[indicator.rsi]
window = 10
lower = 25
"#,
        )
        .unwrap();
        let c = ScanCriteria::from_config(&config, default_registry()).unwrap();
        assert_eq!(c.buy_threshold(), 0.7);
        assert_eq!(c.sell_threshold(), 0.3);
        assert_eq!(c.price_column(), "price");
        assert!(c.adx_scaling());
        assert_eq!(c.weight("rsi"), 0.5);
        assert_eq!(c.params("rsi").unwrap().get("window").unwrap(), 10.0);
    }

    #[test]
    fn from_config_rejects_unknown_indicator_section() {
        let config = FileConfigAdapter::from_string("[indicator.bollinger]\nwindow = 20\n").unwrap();
        let err = ScanCriteria::from_config(&config, default_registry()).unwrap_err();
        assert!(matches!(err, ScanError::Registry(_)));
    }

    #[test]
    fn from_config_rejects_unknown_param() {
        let config = FileConfigAdapter::from_string("[indicator.rsi]\nspan = 20\n").unwrap();
        let err = ScanCriteria::from_config(&config, default_registry()).unwrap_err();
        assert!(matches!(err, ScanError::UnknownParam { .. }));
    }

    #[test]
    fn from_json_reads_payload() {
        let c = ScanCriteria::from_json_str(
            r#"{"weights": {"rsi": 1.0, "macd": 0.5},
                "params": {"rsi": {"window": 7}},
                "buy_threshold": 0.8}"#,
        )
        .unwrap();
        assert_eq!(c.weight("macd"), 0.5);
        assert_eq!(c.buy_threshold(), 0.8);
        assert_eq!(c.sell_threshold(), DEFAULT_SELL_THRESHOLD);
        assert_eq!(c.params("rsi").unwrap().get("window").unwrap(), 7.0);
    }

    #[test]
    fn from_json_rejects_unknown_fields() {
        let err = ScanCriteria::from_json_str(r#"{"score_threshold": 0.5}"#).unwrap_err();
        assert!(matches!(err, ScanError::Json(_)));
    }
}
