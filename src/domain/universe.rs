//! Tradable universe and input loading.
//!
//! Parses symbol lists from configuration, loads each symbol's price history
//! (skipping symbols with no data), and loads the macro indicator series.

use crate::domain::asset_history::AssetHistory;
use crate::domain::error::QuadtraderError;
use crate::domain::macro_series::{MacroInputs, MacroSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub symbols: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

impl From<UniverseError> for QuadtraderError {
    fn from(err: UniverseError) -> Self {
        QuadtraderError::invalid("universe", "symbols", err.to_string())
    }
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone)]
pub struct UniverseValidationResult {
    pub universe: Universe,
    pub assets: Vec<AssetHistory>,
    pub skipped: Vec<SkippedSymbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
}

/// Load price histories through `end_date`, keeping everything before
/// `start_date` too so lookbacks are warm when the window opens.
///
/// Symbols without a file or without any bars are skipped with a warning;
/// malformed data is an error. Fails only when no symbol has data.
pub fn validate_universe(
    data_port: &dyn DataPort,
    symbols: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<UniverseValidationResult, QuadtraderError> {
    let mut valid = Vec::new();
    let mut assets = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let bars = match data_port.fetch_ohlcv(&symbol, NaiveDate::MIN, end_date) {
            Ok(bars) => bars,
            Err(QuadtraderError::NoData { .. }) => {
                tracing::warn!(symbol = %symbol, "skipping symbol: no price file");
                skipped.push(SkippedSymbol {
                    symbol,
                    reason: SkipReason::NoData,
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        if bars.is_empty() {
            tracing::warn!(symbol = %symbol, "skipping symbol: no bars on or before {}", end_date);
            skipped.push(SkippedSymbol {
                symbol,
                reason: SkipReason::NoData,
            });
            continue;
        }

        let in_window = bars.iter().filter(|b| b.date >= start_date).count();
        tracing::debug!(symbol = %symbol, bars = bars.len(), in_window, "symbol loaded");

        assets.push(AssetHistory::new(symbol.clone(), bars)?);
        valid.push(symbol);
    }

    if valid.is_empty() {
        return Err(QuadtraderError::NoData {
            symbol: "universe".to_string(),
        });
    }

    if !skipped.is_empty() {
        tracing::info!(
            loaded = valid.len(),
            total = valid.len() + skipped.len(),
            "universe partially loaded"
        );
    }

    Ok(UniverseValidationResult {
        universe: Universe { symbols: valid },
        assets,
        skipped,
    })
}

/// Load every named macro series through `end_date`. A missing series is an error.
pub fn load_macro_inputs(
    data_port: &dyn DataPort,
    growth: &[String],
    inflation: &[String],
    end_date: NaiveDate,
) -> Result<MacroInputs, QuadtraderError> {
    let load = |names: &[String]| -> Result<Vec<MacroSeries>, QuadtraderError> {
        names
            .iter()
            .map(|name| data_port.fetch_macro(name, NaiveDate::MIN, end_date))
            .collect()
    };
    MacroInputs::new(load(growth)?, load(inflation)?)
}
