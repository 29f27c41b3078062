//! Per-asset momentum, trend filter, volatility and ATR as of a date.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::asset_history::AssetHistory;
use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumConfig {
    /// Trailing window in bars for the rate-of-change score.
    pub lookback: usize,
    /// EMA trend filter period; 0 disables the filter.
    pub ema_period: usize,
    /// Window for realized volatility; 0 disables it.
    pub vol_lookback: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        MomentumConfig {
            lookback: 20,
            ema_period: 50,
            vol_lookback: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetScore {
    pub close: f64,
    pub momentum: Option<f64>,
    pub above_trend: bool,
    pub volatility: Option<f64>,
    pub atr: Option<f64>,
}

impl AssetScore {
    /// Defined, strictly positive momentum and above the trend filter.
    pub fn eligible(&self) -> bool {
        matches!(self.momentum, Some(m) if m.is_finite() && m > 0.0) && self.above_trend
    }
}

#[derive(Debug, Clone, Default)]
pub struct MomentumScorer {
    pub config: MomentumConfig,
    pub atr_period: usize,
}

impl MomentumScorer {
    pub fn new(config: MomentumConfig, atr_period: usize) -> Self {
        MomentumScorer { config, atr_period }
    }

    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        let mut types = vec![IndicatorType::Roc(self.config.lookback)];
        if self.config.ema_period > 0 {
            types.push(IndicatorType::Ema(self.config.ema_period));
        }
        if self.config.vol_lookback > 0 {
            types.push(IndicatorType::Volatility(self.config.vol_lookback));
        }
        if self.atr_period > 0 {
            types.push(IndicatorType::Atr(self.atr_period));
        }
        types
    }

    /// Attach every indicator this scorer reads.
    pub fn prepare(&self, assets: Vec<AssetHistory>) -> Vec<AssetHistory> {
        let types = self.indicator_types();
        assets
            .into_iter()
            .map(|a| a.with_indicators(&types))
            .collect()
    }

    pub fn score(&self, asset: &AssetHistory, date: NaiveDate) -> Option<AssetScore> {
        let idx = asset.index_at_or_before(date)?;
        let close = asset.bars[idx].close;

        let above_trend = if self.config.ema_period == 0 {
            true
        } else {
            asset
                .indicator_at(&IndicatorType::Ema(self.config.ema_period), idx)
                .is_some_and(|ema| close > ema)
        };

        Some(AssetScore {
            close,
            momentum: asset.indicator_at(&IndicatorType::Roc(self.config.lookback), idx),
            above_trend,
            volatility: asset.indicator_at(&IndicatorType::Volatility(self.config.vol_lookback), idx),
            atr: asset.indicator_at(&IndicatorType::Atr(self.atr_period), idx),
        })
    }

    /// Scores for every asset with at least one bar on or before `date`.
    pub fn scores_at(&self, assets: &[AssetHistory], date: NaiveDate) -> BTreeMap<String, AssetScore> {
        assets
            .iter()
            .filter_map(|a| self.score(a, date).map(|s| (a.symbol.clone(), s)))
            .collect()
    }
}
