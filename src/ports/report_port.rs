//! Result sink port trait.

use crate::domain::error::ScanError;
use crate::domain::result::ScanResult;

/// Port for writing scan results.
pub trait ReportPort {
    fn write(&self, results: &[ScanResult], output_path: &str) -> Result<(), ScanError>;
}
