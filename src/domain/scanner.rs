//! Composite-scoring scanner.
//!
//! For each instrument: run every enabled indicator, weight its score, sum
//! the weighted components into a composite, classify against the
//! thresholds and explain the outcome. Instruments are independent and are
//! processed in parallel; the final sort is the only ordering.

use crate::domain::criteria::ScanCriteria;
use crate::domain::error::{RegistryError, ScanError};
use crate::domain::indicator::{adx, IndicatorConfig, IndicatorReading};
use crate::domain::ohlcv::{PriceColumn, TimeSeries};
use crate::domain::registry::{default_registry, IndicatorRegistry, RegistryEntry};
use crate::domain::result::{Recommendation, ScanResult};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Bounds of the ADX confidence multiplier.
const ADX_FACTOR_FLOOR: f64 = 0.5;
const ADX_FACTOR_CEIL: f64 = 1.0;

/// One enabled indicator with its resolved configuration.
struct Step<'r> {
    id: &'r str,
    entry: &'r RegistryEntry,
    config: IndicatorConfig,
    weight: f64,
    min_history: usize,
}

/// Everything validated up front, shared read-only by every instrument.
struct Plan<'r> {
    steps: Vec<Step<'r>>,
    column: PriceColumn,
    adx_gate: Option<(&'r RegistryEntry, IndicatorConfig)>,
    buy_threshold: f64,
    sell_threshold: f64,
}

pub struct Scanner<'r> {
    registry: &'r IndicatorRegistry,
}

impl<'r> Scanner<'r> {
    pub fn new(registry: &'r IndicatorRegistry) -> Self {
        Self { registry }
    }

    /// Scan every instrument, returning one result per input ranked by
    /// composite score (descending, ties by code).
    ///
    /// Criteria are validated before any instrument is touched; an unknown
    /// indicator or bad parameter fails the whole call.
    pub fn scan(
        &self,
        instruments: &BTreeMap<String, TimeSeries>,
        criteria: &ScanCriteria,
    ) -> Result<Vec<ScanResult>, ScanError> {
        let plan = self.plan(criteria)?;

        let mut results = instruments
            .par_iter()
            .map(|(code, series)| scan_instrument(code, series, &plan))
            .collect::<Result<Vec<_>, ScanError>>()?;

        results.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.code.cmp(&b.code))
        });

        let count = |r: Recommendation| results.iter().filter(|x| x.recommendation == r).count();
        info!(
            instruments = results.len(),
            indicators = plan.steps.len(),
            buy = count(Recommendation::Buy),
            sell = count(Recommendation::Sell),
            hold = count(Recommendation::Hold),
            "scan complete"
        );
        Ok(results)
    }

    fn plan(&self, criteria: &ScanCriteria) -> Result<Plan<'r>, ScanError> {
        let resolved = criteria.resolve(self.registry)?;
        let registry: &'r IndicatorRegistry = self.registry;

        let mut steps = Vec::new();
        for (id, weight) in criteria.enabled() {
            let entry = registry.get(id)?;
            let config = resolved
                .configs
                .get(id)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownIndicator(id.to_string()))?;
            let min_history = entry.indicator.min_history(&config)?;
            steps.push(Step {
                id: entry.id.as_str(),
                entry,
                config,
                weight,
                min_history,
            });
        }

        let adx_gate = if criteria.adx_scaling() {
            let entry = registry.get(adx::ID)?;
            let config = match resolved.configs.get(adx::ID) {
                Some(c) => c.clone(),
                None => entry.schema.resolve(adx::ID, &IndicatorConfig::new())?,
            };
            Some((entry, config))
        } else {
            None
        };

        Ok(Plan {
            steps,
            column: resolved.price_column,
            adx_gate,
            buy_threshold: criteria.buy_threshold(),
            sell_threshold: criteria.sell_threshold(),
        })
    }
}

/// Scan with the process-wide default registry.
pub fn scan(
    instruments: &BTreeMap<String, TimeSeries>,
    criteria: &ScanCriteria,
) -> Result<Vec<ScanResult>, ScanError> {
    Scanner::new(default_registry()).scan(instruments, criteria)
}

/// Multiplier for directional components from the latest ADX.
fn adx_factor(reading: &IndicatorReading, config: &IndicatorConfig) -> Option<f64> {
    let value = reading.metric("adx")?;
    let threshold = config.get("trend_threshold").ok().filter(|&t| t > 0.0)?;
    Some((value / threshold).clamp(ADX_FACTOR_FLOOR, ADX_FACTOR_CEIL))
}

fn scan_instrument(
    code: &str,
    series: &TimeSeries,
    plan: &Plan<'_>,
) -> Result<ScanResult, ScanError> {
    if series.is_empty() {
        warn!(code, "empty series, holding");
        return Ok(ScanResult::insufficient(
            code,
            "No price data available; holding with score 0.00".to_string(),
        ));
    }
    if series.column(plan.column).is_none() {
        warn!(code, column = %plan.column, "price column unavailable, holding");
        return Ok(ScanResult::insufficient(
            code,
            format!(
                "Price column '{}' is unavailable; holding with score 0.00",
                plan.column
            ),
        ));
    }

    let mut readings = Vec::with_capacity(plan.steps.len());
    for step in &plan.steps {
        let reading = step.entry.indicator.compute(series, plan.column, &step.config)?;
        debug!(code, indicator = step.id, score = reading.score, "indicator computed");
        readings.push(reading);
    }

    let factor = match &plan.adx_gate {
        Some((entry, config)) => {
            let reading = match plan.steps.iter().position(|s| s.id == adx::ID) {
                Some(i) => readings[i].clone(),
                None => entry.indicator.compute(series, plan.column, config)?,
            };
            adx_factor(&reading, config)
        }
        None => None,
    };

    let mut components = BTreeMap::new();
    let mut snapshot = BTreeMap::new();
    for (step, reading) in plan.steps.iter().zip(&readings) {
        let contribution = step.weight * reading.score * factor.unwrap_or(1.0);
        components.insert(step.id.to_string(), contribution);
        snapshot.extend(reading.snapshot.iter().map(|(k, v)| (k.clone(), *v)));
    }
    let composite = components.values().fold(0.0, |acc, c| acc + c);
    let recommendation =
        Recommendation::classify(composite, plan.buy_threshold, plan.sell_threshold);

    let reasons = explain(series, plan, &readings, &components, factor, composite, recommendation);

    Ok(ScanResult {
        code: code.to_string(),
        recommendation,
        composite_score: composite,
        components,
        indicators_snapshot: snapshot,
        reasons,
    })
}

fn explain(
    series: &TimeSeries,
    plan: &Plan<'_>,
    readings: &[IndicatorReading],
    components: &BTreeMap<String, f64>,
    factor: Option<f64>,
    composite: f64,
    recommendation: Recommendation,
) -> Vec<String> {
    let mut reasons = Vec::new();

    for (step, reading) in plan.steps.iter().zip(readings) {
        let contribution = components.get(step.id).copied().unwrap_or(0.0);
        if contribution == 0.0 {
            continue;
        }
        let scaling = match factor {
            Some(f) if f != 1.0 => format!(" × ADX confidence {:.2}", f),
            _ => String::new(),
        };
        reasons.push(format!(
            "{} ({}): weight {:.2} × score {:.2}{} = {:.4}",
            step.entry.schema.label, step.id, step.weight, reading.score, scaling, contribution
        ));
        reasons.extend(
            step.entry
                .indicator
                .explain(reading, &step.config)
                .into_iter()
                .map(|line| format!("  {}", line)),
        );
    }

    for step in plan.steps.iter().filter(|s| series.len() < s.min_history) {
        reasons.push(format!(
            "{} ({}): insufficient history ({} of {} bars), treated as neutral",
            step.entry.schema.label,
            step.id,
            series.len(),
            step.min_history
        ));
    }

    let unavailable = plan
        .steps
        .iter()
        .zip(readings)
        .filter(|(step, _)| series.len() >= step.min_history)
        .filter(|(_, reading)| reading.snapshot.values().all(Option::is_none));
    for (step, reading) in unavailable {
        let detail = match step.entry.indicator.explain(reading, &step.config) {
            lines if reading.snapshot.is_empty() && !lines.is_empty() => lines.join("; "),
            _ => "required data unavailable".to_string(),
        };
        reasons.push(format!(
            "{} ({}): {}, treated as neutral",
            step.entry.schema.label, step.id, detail
        ));
    }

    reasons.push(match recommendation {
        Recommendation::Buy => format!(
            "Composite score {:.4} is at or above buy threshold {:.4}: BUY",
            composite, plan.buy_threshold
        ),
        Recommendation::Sell => format!(
            "Composite score {:.4} is at or below sell threshold -{:.4}: SELL",
            composite, plan.sell_threshold
        ),
        Recommendation::Hold => format!(
            "Composite score {:.4} is between sell threshold -{:.4} and buy threshold {:.4}: HOLD",
            composite, plan.sell_threshold, plan.buy_threshold
        ),
    });
    reasons
}
