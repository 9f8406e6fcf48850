//! Domain error types.
//!
//! Configuration mistakes surface as errors. Sparse or short data never does:
//! indicators degrade to a neutral score instead.

/// Registration and lookup failures in the indicator registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("indicator {0} is already registered with a different implementation")]
    DuplicateIndicator(String),
}

/// Top-level error type for fundscan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid parameter {indicator}.{param}: {reason}")]
    InvalidParam {
        indicator: String,
        param: String,
        reason: String,
    },

    #[error("unknown parameter {indicator}.{param}")]
    UnknownParam { indicator: String, param: String },

    #[error("unknown price column: {column}")]
    UnknownColumn { column: String },

    #[error("timestamps must be strictly increasing (violated at bar {index})")]
    UnorderedSeries { index: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn invalid_param(
        indicator: impl Into<String>,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ScanError::InvalidParam {
            indicator: indicator.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(
        section: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ScanError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<&ScanError> for std::process::ExitCode {
    fn from(err: &ScanError) -> Self {
        let code: u8 = match err {
            ScanError::Io(_) | ScanError::Json(_) => 1,
            ScanError::ConfigParse { .. }
            | ScanError::ConfigInvalid { .. }
            | ScanError::UnknownColumn { .. } => 2,
            ScanError::DataSource { .. } | ScanError::UnorderedSeries { .. } => 3,
            ScanError::Registry(_)
            | ScanError::InvalidParam { .. }
            | ScanError::UnknownParam { .. } => 4,
            ScanError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_converts_transparently() {
        let err: ScanError = RegistryError::UnknownIndicator("bogus".into()).into();
        assert_eq!(err.to_string(), "unknown indicator: bogus");
    }

    #[test]
    fn invalid_param_message() {
        let err = ScanError::invalid_param("rsi", "window", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter rsi.window: must be at least 1"
        );
    }

    #[test]
    fn duplicate_message_names_the_id() {
        let err = RegistryError::DuplicateIndicator("macd".into());
        assert!(err.to_string().contains("macd"));
    }
}
