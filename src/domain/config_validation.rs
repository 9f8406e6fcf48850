//! Configuration validation.
//!
//! Validates the `[scan]` and `[weights]` sections before any data is
//! fetched. Indicator parameter sections are checked against the registry
//! schemas when criteria are built.

use crate::domain::error::ScanError;
use crate::domain::ohlcv::PriceColumn;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const SCAN_SECTION: &str = "scan";
pub const WEIGHTS_SECTION: &str = "weights";
pub const INDICATOR_SECTION_PREFIX: &str = "indicator.";

pub fn validate_scan_config(config: &dyn ConfigPort) -> Result<(), ScanError> {
    validate_thresholds(config)?;
    validate_price_column(config)?;
    validate_adx_scaling(config)?;
    validate_dates(config)?;
    validate_codes(config)?;
    validate_weights(config)?;
    Ok(())
}

/// Optional finite real at `[section] key`.
pub fn parse_real(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, ScanError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Err(ScanError::config_invalid(section, key, "must be finite")),
        Err(_) => Err(ScanError::config_invalid(
            section,
            key,
            format!("expected a number, got '{}'", raw.trim()),
        )),
    }
}

/// Optional boolean at `[section] key` (true/yes/1, false/no/0).
pub fn parse_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<bool>, ScanError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(Some(true)),
        "false" | "no" | "0" => Ok(Some(false)),
        other => Err(ScanError::config_invalid(
            section,
            key,
            format!("expected a boolean, got '{}'", other),
        )),
    }
}

/// Optional `YYYY-MM-DD` date in `[scan]`.
pub fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<Option<NaiveDate>, ScanError> {
    match config.get_string(SCAN_SECTION, field) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ScanError::config_invalid(
                    SCAN_SECTION,
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

/// Comma-separated instrument codes from `[scan] codes`, trimmed and
/// upper-cased. Empty when the key is absent.
pub fn parse_codes(config: &dyn ConfigPort) -> Vec<String> {
    config
        .get_string(SCAN_SECTION, "codes")
        .map(|s| {
            s.split(',')
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), ScanError> {
    for key in ["buy_threshold", "sell_threshold"] {
        parse_real(config, SCAN_SECTION, key)?;
    }
    Ok(())
}

fn validate_price_column(config: &dyn ConfigPort) -> Result<(), ScanError> {
    if let Some(raw) = config.get_string(SCAN_SECTION, "price_column") {
        raw.parse::<PriceColumn>().map_err(|_| {
            ScanError::config_invalid(
                SCAN_SECTION,
                "price_column",
                format!("unknown price column '{}'", raw.trim()),
            )
        })?;
    }
    Ok(())
}

fn validate_adx_scaling(config: &dyn ConfigPort) -> Result<(), ScanError> {
    parse_bool(config, SCAN_SECTION, "adx_scaling").map(|_| ())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ScanError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(ScanError::config_invalid(
                SCAN_SECTION,
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), ScanError> {
    match config.get_string(SCAN_SECTION, "codes") {
        Some(_) if parse_codes(config).is_empty() => Err(ScanError::config_invalid(
            SCAN_SECTION,
            "codes",
            "codes must name at least one instrument",
        )),
        _ => Ok(()),
    }
}

fn validate_weights(config: &dyn ConfigPort) -> Result<(), ScanError> {
    for key in config.keys(WEIGHTS_SECTION) {
        parse_real(config, WEIGHTS_SECTION, &key)?;
    }
    Ok(())
}
