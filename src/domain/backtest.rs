//! Historical simulation: replays the strategy date by date over the unified
//! price timeline, applying stops and rebalancing into the day's targets.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::domain::asset_history::{build_unified_timeline, AssetHistory};
use crate::domain::error::QuadtraderError;
use crate::domain::indicator::IndicatorType;
use crate::domain::macro_series::MacroInputs;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::{turnover, NavPoint, Portfolio, RebalanceRecord};
use crate::domain::position::TradeEvent;
use crate::domain::regime::RegimeState;
use crate::domain::strategy::QuadStrategy;

/// What to do with dates before the classifier has enough macro history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarmupPolicy {
    /// Leave them out of the run entirely.
    #[default]
    Skip,
    /// Record them with flat NAV and no positions.
    HoldCash,
}

impl FromStr for WarmupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(WarmupPolicy::Skip),
            "hold_cash" | "cash" => Ok(WarmupPolicy::HoldCash),
            other => Err(format!("unknown warmup policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub warmup: WarmupPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightSnapshot {
    pub date: NaiveDate,
    pub weights: BTreeMap<String, f64>,
    pub total_leverage: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub final_value: f64,
    pub nav_curve: Vec<NavPoint>,
    pub weight_history: Vec<WeightSnapshot>,
    pub quadrant_history: Vec<RegimeState>,
    pub trade_log: Vec<TradeEvent>,
    pub rebalances: Vec<RebalanceRecord>,
}

impl BacktestResult {
    pub fn metrics(&self) -> Metrics {
        Metrics::compute(&self.nav_curve, self.initial_capital)
    }
}

pub fn run_backtest(
    assets: &[AssetHistory],
    inputs: &MacroInputs,
    strategy: &QuadStrategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, QuadtraderError> {
    let timeline: Vec<NaiveDate> = build_unified_timeline(assets)
        .into_iter()
        .filter(|d| *d >= config.start_date && *d <= config.end_date)
        .collect();
    if timeline.is_empty() {
        return Err(QuadtraderError::EmptyDateRange {
            start: config.start_date,
            end: config.end_date,
        });
    }

    let by_symbol: HashMap<&str, &AssetHistory> =
        assets.iter().map(|a| (a.symbol.as_str(), a)).collect();

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut regime: Option<RegimeState> = None;
    let mut weight_history = Vec::new();
    let mut quadrant_history = Vec::new();
    let mut warmup_err = None;
    let mut started = false;

    for &date in &timeline {
        let step = match strategy.evaluate(assets, inputs, date, regime.as_ref()) {
            Ok(step) => Some(step),
            Err(e) if e.is_insufficient_history() => {
                warmup_err = Some(e);
                None
            }
            Err(e) => return Err(e),
        };

        if step.is_none() && !started && config.warmup == WarmupPolicy::Skip {
            continue;
        }
        if !started {
            tracing::debug!(date = %date, "simulation starts");
            started = true;
        }

        // returns accrue to the book held going into `date`
        portfolio.advance_nav(date, |symbol| {
            by_symbol.get(symbol).map_or(0.0, |a| a.daily_return(date))
        });

        let Some(step) = step else {
            continue;
        };

        let held_before = portfolio.weights();
        let stop_events = strategy
            .stop_loss
            .apply(&mut portfolio.positions, &step.scores, date);

        let mut targets = step.allocation.weights.clone();
        for ev in &stop_events {
            targets.remove(&ev.symbol);
        }

        let trades = portfolio.rebalance(date, &targets, &step.scores, &strategy.stop_loss);
        let weights = portfolio.weights();
        let day_turnover = turnover(&held_before, &weights);

        let mut events = stop_events;
        events.extend(trades);
        portfolio.record_rebalance(date, day_turnover, events);

        weight_history.push(WeightSnapshot {
            date,
            total_leverage: portfolio.total_leverage(),
            weights,
        });
        quadrant_history.push(step.regime.clone());
        regime = Some(step.regime);
    }

    if !started {
        return Err(warmup_err.unwrap_or(QuadtraderError::EmptyDateRange {
            start: config.start_date,
            end: config.end_date,
        }));
    }

    tracing::info!(
        days = portfolio.nav_curve.len(),
        trades = portfolio.trade_log.len(),
        open_positions = portfolio.position_count(),
        final_value = portfolio.nav,
        "backtest complete"
    );

    Ok(BacktestResult {
        initial_capital: config.initial_capital,
        final_value: portfolio.nav,
        nav_curve: portfolio.nav_curve,
        weight_history,
        quadrant_history,
        trade_log: portfolio.trade_log,
        rebalances: portfolio.rebalances,
    })
}

/// A named what-if run with its own strategy and window.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub strategy: QuadStrategy,
    pub config: BacktestConfig,
}

/// Attach the union of indicators every scenario reads.
pub fn prepare_scenarios(assets: Vec<AssetHistory>, scenarios: &[Scenario]) -> Vec<AssetHistory> {
    let mut types: Vec<IndicatorType> = Vec::new();
    for s in scenarios {
        for t in s.strategy.momentum.indicator_types() {
            if !types.contains(&t) {
                types.push(t);
            }
        }
    }
    assets.into_iter().map(|a| a.with_indicators(&types)).collect()
}

/// Run independent scenarios in parallel; each owns all of its state.
///
/// Assets must already carry the indicators every scenario reads
/// (see [`prepare_scenarios`]).
pub fn run_scenarios(
    assets: &[AssetHistory],
    inputs: &MacroInputs,
    scenarios: &[Scenario],
) -> Vec<(String, Result<BacktestResult, QuadtraderError>)> {
    scenarios
        .par_iter()
        .map(|s| (s.name.clone(), run_backtest(assets, inputs, &s.strategy, &s.config)))
        .collect()
}
