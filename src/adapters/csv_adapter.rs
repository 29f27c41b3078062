//! CSV file data adapter.
//!
//! Layout under the base directory:
//! - `{SYMBOL}.csv` with header `date,open,high,low,close,volume`
//! - `macro/{NAME}.csv` with header `date,value`
//!
//! Dates are `YYYY-MM-DD`. Macro values of `.` or blank are gaps and are skipped.

use crate::domain::error::QuadtraderError;
use crate::domain::macro_series::{MacroReading, MacroSeries};
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

const MACRO_DIR: &str = "macro";

pub struct CsvAdapter {
    base_path: PathBuf,
}

fn data_err(reason: String) -> QuadtraderError {
    QuadtraderError::Data { reason }
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, name: &str, path: &Path) -> Result<&'a str, QuadtraderError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| data_err(format!("{}: missing {} column", path.display(), name)))
}

fn parse_f64(raw: &str, name: &str, path: &Path) -> Result<f64, QuadtraderError> {
    raw.parse()
        .map_err(|e| data_err(format!("{}: invalid {} value {:?}: {}", path.display(), name, raw, e)))
}

fn parse_date(raw: &str, path: &Path) -> Result<NaiveDate, QuadtraderError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| data_err(format!("{}: invalid date {:?}: {}", path.display(), raw, e)))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn price_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn macro_path(&self, name: &str) -> PathBuf {
        self.base_path.join(MACRO_DIR).join(format!("{}.csv", name))
    }

    fn read(path: &Path, missing: &str) -> Result<String, QuadtraderError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(QuadtraderError::NoData {
                symbol: missing.to_string(),
            }),
            Err(e) => Err(data_err(format!("failed to read {}: {}", path.display(), e))),
        }
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, QuadtraderError> {
        let path = self.price_path(symbol);
        let content = Self::read(&path, symbol)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_err(format!("{}: CSV parse error: {}", path.display(), e)))?;

            let date = parse_date(field(&record, 0, "date", &path)?, &path)?;
            if date < start_date || date > end_date {
                continue;
            }

            let open = parse_f64(field(&record, 1, "open", &path)?, "open", &path)?;
            let high = parse_f64(field(&record, 2, "high", &path)?, "high", &path)?;
            let low = parse_f64(field(&record, 3, "low", &path)?, "low", &path)?;
            let close = parse_f64(field(&record, 4, "close", &path)?, "close", &path)?;
            let raw_volume = field(&record, 5, "volume", &path)?;
            // some vendors write volume as a float
            let volume = match raw_volume.parse::<i64>() {
                Ok(v) => v,
                Err(_) => parse_f64(raw_volume, "volume", &path)? as i64,
            };

            bars.push(OhlcvBar {
                symbol: symbol.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(symbol, bars = bars.len(), "loaded prices");
        Ok(bars)
    }

    fn fetch_macro(
        &self,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<MacroSeries, QuadtraderError> {
        let path = self.macro_path(name);
        let content = Self::read(&path, name)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut readings = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_err(format!("{}: CSV parse error: {}", path.display(), e)))?;

            let date = parse_date(field(&record, 0, "date", &path)?, &path)?;
            if date < start_date || date > end_date {
                continue;
            }
            let raw = field(&record, 1, "value", &path)?;
            if raw.is_empty() || raw == "." {
                continue;
            }
            readings.push(MacroReading {
                date,
                value: parse_f64(raw, "value", &path)?,
            });
        }

        readings.sort_by_key(|r| r.date);
        tracing::debug!(series = name, readings = readings.len(), "loaded macro series");
        MacroSeries::new(name, readings)
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuadtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_err(format!("failed to read directory {}: {}", self.base_path.display(), e))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_err(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuadtraderError> {
        let bars = match self.fetch_ohlcv(symbol, NaiveDate::MIN, NaiveDate::MAX) {
            Ok(bars) => bars,
            Err(QuadtraderError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
