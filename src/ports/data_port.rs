//! Data access port trait.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

/// Source of daily OHLCV bars, one series per instrument code.
pub trait DataPort {
    /// Bars for `code` with `start_date <= date <= end_date`, ascending.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TurtleError>;

    fn list_symbols(&self) -> Result<Vec<String>, TurtleError>;

    /// First date, last date and bar count, or `None` if the code has no bars.
    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TurtleError>;
}
