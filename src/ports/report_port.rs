//! Report output port trait.

use crate::domain::error::QuadtraderError;
use crate::domain::report::{BacktestReport, HistoryReport, SignalsReport};

/// Port for writing the output documents.
pub trait ReportPort {
    fn write_signals(&self, report: &SignalsReport, output_path: &str) -> Result<(), QuadtraderError>;

    fn write_backtest(&self, report: &BacktestReport, output_path: &str) -> Result<(), QuadtraderError>;

    fn write_history(&self, report: &HistoryReport, output_path: &str) -> Result<(), QuadtraderError>;
}
