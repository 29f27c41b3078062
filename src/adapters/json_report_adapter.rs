//! JSON report adapter implementing ReportPort.
//!
//! Pretty-printed documents; an output path of `-` writes to stdout.

use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::domain::error::QuadtraderError;
use crate::domain::report::{BacktestReport, HistoryReport, SignalsReport};
use crate::ports::report_port::ReportPort;

pub const STDOUT_PATH: &str = "-";

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        JsonReportAdapter
    }

    fn write_document<T: Serialize>(&self, document: &T, output_path: &str) -> Result<(), QuadtraderError> {
        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');

        if output_path == STDOUT_PATH {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(json.as_bytes())?;
            lock.flush()?;
            return Ok(());
        }

        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        tracing::debug!(path = output_path, "report written");
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_signals(&self, report: &SignalsReport, output_path: &str) -> Result<(), QuadtraderError> {
        self.write_document(report, output_path)
    }

    fn write_backtest(&self, report: &BacktestReport, output_path: &str) -> Result<(), QuadtraderError> {
        self.write_document(report, output_path)
    }

    fn write_history(&self, report: &HistoryReport, output_path: &str) -> Result<(), QuadtraderError> {
        self.write_document(report, output_path)
    }
}
