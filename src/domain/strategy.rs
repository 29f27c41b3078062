//! The quadrant strategy: classifier, scorer, allocation engine and stops
//! composed into one per-date evaluation shared by the live and historical paths.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::allocation::{Allocation, AllocationConfig, AllocationEngine, AllocationTable};
use crate::domain::asset_history::AssetHistory;
use crate::domain::error::QuadtraderError;
use crate::domain::macro_series::MacroInputs;
use crate::domain::momentum::{AssetScore, MomentumConfig, MomentumScorer};
use crate::domain::quadrant::QuadrantScore;
use crate::domain::regime::{RegimeClassifier, RegimeConfig, RegimeState};
use crate::domain::stop_loss::{StopLossConfig, StopLossManager};

#[derive(Debug, Clone)]
pub struct QuadStrategy {
    pub regime: RegimeClassifier,
    pub momentum: MomentumScorer,
    pub allocation: AllocationEngine,
    pub stop_loss: StopLossManager,
}

/// Everything computed for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyStep {
    pub score: QuadrantScore,
    pub regime: RegimeState,
    pub allocation: Allocation,
    /// Scores for every asset with a price, including ones excluded from allocation.
    pub scores: BTreeMap<String, AssetScore>,
}

impl Default for QuadStrategy {
    fn default() -> Self {
        QuadStrategy::new(
            RegimeConfig::default(),
            MomentumConfig::default(),
            AllocationTable::standard(),
            AllocationConfig::default(),
            StopLossConfig::default(),
        )
    }
}

impl QuadStrategy {
    pub fn new(
        regime: RegimeConfig,
        momentum: MomentumConfig,
        table: AllocationTable,
        allocation: AllocationConfig,
        stop_loss: StopLossConfig,
    ) -> Self {
        let atr_period = stop_loss.atr_period;
        QuadStrategy {
            regime: RegimeClassifier::new(regime),
            momentum: MomentumScorer::new(momentum, atr_period),
            allocation: AllocationEngine::new(table, allocation),
            stop_loss: StopLossManager::new(stop_loss),
        }
    }

    pub fn table(&self) -> &AllocationTable {
        &self.allocation.table
    }

    /// Attach the indicators the scorer and stops need.
    pub fn prepare(&self, assets: Vec<AssetHistory>) -> Vec<AssetHistory> {
        self.momentum.prepare(assets)
    }

    /// Scores eligible for allocation: with stops on, an undefined ATR excludes the asset.
    pub fn candidates(&self, scores: &BTreeMap<String, AssetScore>) -> BTreeMap<String, AssetScore> {
        if !self.stop_loss.enabled() {
            return scores.clone();
        }
        scores
            .iter()
            .filter(|(_, s)| s.atr.is_some())
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect()
    }

    pub fn evaluate(
        &self,
        assets: &[AssetHistory],
        inputs: &MacroInputs,
        date: NaiveDate,
        prev: Option<&RegimeState>,
    ) -> Result<StrategyStep, QuadtraderError> {
        let (score, regime) = self.regime.classify(inputs, date, prev)?;
        let scores = self.momentum.scores_at(assets, date);
        let allocation = self.allocation.allocate(&regime, &self.candidates(&scores));

        Ok(StrategyStep {
            score,
            regime,
            allocation,
            scores,
        })
    }
}
