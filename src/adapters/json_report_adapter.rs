//! JSON report adapter implementing ReportPort.
//!
//! Writes the ranked results as a pretty-printed JSON array.

use std::fs;
use std::path::Path;

use crate::domain::error::ScanError;
use crate::domain::result::{results_to_json, ScanResult};
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, results: &[ScanResult]) -> Result<String, ScanError> {
        let mut json = serde_json::to_string_pretty(&results_to_json(results))?;
        json.push('\n');
        Ok(json)
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, results: &[ScanResult], output_path: &str) -> Result<(), ScanError> {
        let json = self.render(results)?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        tracing::info!(path = output_path, results = results.len(), "report written");
        Ok(())
    }
}
