//! Scan results and their JSON form.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    /// BUY is checked first, so overlapping thresholds favour BUY.
    pub fn classify(score: f64, buy_threshold: f64, sell_threshold: f64) -> Self {
        if score >= buy_threshold {
            Recommendation::Buy
        } else if score <= -sell_threshold {
            Recommendation::Sell
        } else {
            Recommendation::Hold
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Sell => "SELL",
            Recommendation::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of scanning one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub code: String,
    pub recommendation: Recommendation,
    pub composite_score: f64,
    /// indicator id → weight × score; sums to `composite_score`.
    pub components: BTreeMap<String, f64>,
    pub indicators_snapshot: BTreeMap<String, Option<f64>>,
    pub reasons: Vec<String>,
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

impl ScanResult {
    /// HOLD result for an instrument that could not be evaluated.
    pub fn insufficient(code: &str, reason: String) -> Self {
        Self {
            code: code.to_string(),
            recommendation: Recommendation::Hold,
            composite_score: 0.0,
            components: BTreeMap::new(),
            indicators_snapshot: BTreeMap::new(),
            reasons: vec![reason],
        }
    }

    /// Plain JSON value; non-finite numbers become `null`.
    pub fn to_json(&self) -> Value {
        let components: Map<String, Value> = self
            .components
            .iter()
            .map(|(k, &v)| (k.clone(), number(v)))
            .collect();
        let snapshot: Map<String, Value> = self
            .indicators_snapshot
            .iter()
            .map(|(k, v)| (k.clone(), v.map_or(Value::Null, number)))
            .collect();

        let mut out = Map::new();
        out.insert("code".into(), Value::String(self.code.clone()));
        out.insert(
            "recommendation".into(),
            Value::String(self.recommendation.as_str().to_string()),
        );
        out.insert("composite_score".into(), number(self.composite_score));
        out.insert("components".into(), Value::Object(components));
        out.insert("indicators_snapshot".into(), Value::Object(snapshot));
        out.insert(
            "reasons".into(),
            Value::Array(self.reasons.iter().cloned().map(Value::String).collect()),
        );
        Value::Object(out)
    }
}

/// JSON array of every result, in the given order.
pub fn results_to_json(results: &[ScanResult]) -> Value {
    Value::Array(results.iter().map(ScanResult::to_json).collect())
}
