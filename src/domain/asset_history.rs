//! Per-asset price history with precomputed indicators, and the unified
//! trading timeline across assets.

use crate::domain::error::QuadtraderError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct AssetHistory {
    pub symbol: String,
    pub bars: Vec<OhlcvBar>,
    pub indicators: HashMap<IndicatorType, IndicatorSeries>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl AssetHistory {
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, QuadtraderError> {
        let symbol = symbol.into();
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(QuadtraderError::UnorderedSeries {
                    series: symbol,
                    date: pair[1].date,
                });
            }
        }
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Ok(Self {
            symbol,
            bars,
            indicators: HashMap::new(),
            date_index,
        })
    }

    pub fn with_indicators(mut self, types: &[IndicatorType]) -> Self {
        self.indicators = compute_indicators(&self.bars, types);
        self
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    /// Index of the latest bar dated on or before `date`.
    pub fn index_at_or_before(&self, date: NaiveDate) -> Option<usize> {
        if let Some(&i) = self.date_index.get(&date) {
            return Some(i);
        }
        let end = self.bars.partition_point(|b| b.date <= date);
        end.checked_sub(1)
    }

    pub fn indicator_at(&self, indicator_type: &IndicatorType, index: usize) -> Option<f64> {
        self.indicators
            .get(indicator_type)
            .and_then(|series| series.value_at(index))
    }

    /// Close-to-close return into `date`; 0 when the asset has no bar that day
    /// or no earlier bar to compare against.
    pub fn daily_return(&self, date: NaiveDate) -> f64 {
        match self.date_index.get(&date) {
            Some(&i) if i > 0 => self.bars[i].return_from(self.bars[i - 1].close),
            _ => 0.0,
        }
    }
}

pub fn build_unified_timeline(assets: &[AssetHistory]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = assets
        .iter()
        .flat_map(|a| a.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
