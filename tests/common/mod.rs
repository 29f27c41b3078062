#![allow(dead_code)]

use chrono::NaiveDate;
use quadtrader::domain::allocation::{AllocationConfig, AllocationTable};
use quadtrader::domain::asset_history::AssetHistory;
use quadtrader::domain::backtest::{BacktestConfig, WarmupPolicy};
use quadtrader::domain::error::QuadtraderError;
use quadtrader::domain::macro_series::{MacroInputs, MacroReading, MacroSeries};
use quadtrader::domain::momentum::MomentumConfig;
pub use quadtrader::domain::ohlcv::OhlcvBar;
use quadtrader::domain::quadrant::Quadrant;
use quadtrader::domain::regime::RegimeConfig;
use quadtrader::domain::stop_loss::StopLossConfig;
use quadtrader::domain::strategy::QuadStrategy;
use quadtrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub macros: HashMap<String, Vec<MacroReading>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            macros: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_macro(mut self, name: &str, readings: Vec<MacroReading>) -> Self {
        self.macros.insert(name.to_string(), readings);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, QuadtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(QuadtraderError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).ok_or_else(|| QuadtraderError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .cloned()
            .collect())
    }

    fn fetch_macro(
        &self,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<MacroSeries, QuadtraderError> {
        let readings = self.macros.get(name).ok_or_else(|| QuadtraderError::NoData {
            symbol: name.to_string(),
        })?;
        MacroSeries::new(
            name,
            readings
                .iter()
                .filter(|r| r.date >= start_date && r.date <= end_date)
                .copied()
                .collect(),
        )
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuadtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuadtraderError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Day `n` counted from 2024-01-01.
pub fn day(n: i64) -> NaiveDate {
    date(2024, 1, 1) + chrono::Duration::days(n)
}

/// One bar per calendar day from `day(0)`, with high = low = close.
pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            symbol: symbol.to_string(),
            date: day(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000,
        })
        .collect()
}

pub fn linear_closes(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

pub fn asset(symbol: &str, closes: &[f64]) -> AssetHistory {
    AssetHistory::new(symbol, bars_from_closes(symbol, closes)).unwrap()
}

pub fn trending_readings(start: f64, step: f64, count: usize) -> Vec<MacroReading> {
    (0..count)
        .map(|i| MacroReading {
            date: day(i as i64),
            value: start + step * i as f64,
        })
        .collect()
}

/// Growth rising, inflation falling: a Q1 (Goldilocks) backdrop.
pub fn goldilocks_inputs(count: usize) -> MacroInputs {
    MacroInputs::new(
        vec![MacroSeries::new("GDP", trending_readings(100.0, 1.0, count)).unwrap()],
        vec![MacroSeries::new("CPI", trending_readings(100.0, -1.0, count)).unwrap()],
    )
    .unwrap()
}

/// Short windows so a handful of bars warms everything up.
pub fn small_strategy(table: AllocationTable, stop_multiplier: f64) -> QuadStrategy {
    QuadStrategy::new(
        RegimeConfig {
            trend_window: 3,
            smoothing_window: 1,
            ..RegimeConfig::default()
        },
        MomentumConfig {
            lookback: 3,
            ema_period: 0,
            vol_lookback: 0,
        },
        table,
        AllocationConfig {
            leverage: 1.0,
            primary_ratio: 1.0,
            ..AllocationConfig::default()
        },
        StopLossConfig {
            atr_period: 3,
            multiplier: stop_multiplier,
        },
    )
}

pub fn q1_table(symbols: &[&str]) -> AllocationTable {
    AllocationTable::default().with_quadrant(
        Quadrant::Q1,
        symbols.iter().map(|s| s.to_string()).collect(),
    )
}

pub fn sample_config(start: i64, end: i64, initial_capital: f64) -> BacktestConfig {
    BacktestConfig {
        start_date: day(start),
        end_date: day(end),
        initial_capital,
        warmup: WarmupPolicy::Skip,
    }
}
