//! Data access port trait.

use crate::domain::error::ScanError;
use crate::domain::ohlcv::TimeSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Series for `code` restricted to `[start_date, end_date]`; either bound
    /// may be open.
    fn fetch_series(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<TimeSeries, ScanError>;

    fn list_symbols(&self) -> Result<Vec<String>, ScanError>;

    /// (first date, last date, bar count), or `None` when the code has no bars.
    fn get_data_range(&self, code: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ScanError>;
}
