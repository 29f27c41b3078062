//! Data access port trait: the indicator feed.

use crate::domain::error::QuadtraderError;
use crate::domain::macro_series::MacroSeries;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `symbol` with `start_date <= date <= end_date`, oldest first.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, QuadtraderError>;

    /// Readings of one macro indicator within the window.
    fn fetch_macro(
        &self,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<MacroSeries, QuadtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, QuadtraderError>;

    /// First date, last date and bar count, or `None` when the symbol has no bars.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuadtraderError>;
}
