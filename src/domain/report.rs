//! Output documents for signals, backtests and the history feed.
//!
//! Field names are camelCase on the wire. Percent fields are scaled by 100
//! and rounded to two decimals; allocations keep four.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::allocation::{Allocation, AssetCategory, Conviction, Signal};
use crate::domain::backtest::BacktestResult;
use crate::domain::events::HistoryEvent;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::NavPoint;
use crate::domain::quadrant::{Direction, Quadrant};
use crate::domain::regime::RegimeState;

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn pct(value: f64) -> f64 {
    round_to(value * 100.0, 2)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEntry {
    pub asset: String,
    pub signal: Signal,
    pub target_allocation: f64,
    pub conviction: Conviction,
    pub category: AssetCategory,
    pub quadrant: Quadrant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeEntry {
    pub primary_quadrant: Quadrant,
    pub secondary_quadrant: Quadrant,
    pub growth_direction: Direction,
    pub inflation_direction: Direction,
    pub days_in_regime: u32,
    pub last_change: String,
    pub confidence: f64,
}

impl From<&RegimeState> for RegimeEntry {
    fn from(state: &RegimeState) -> Self {
        RegimeEntry {
            primary_quadrant: state.primary,
            secondary_quadrant: state.secondary,
            growth_direction: state.growth_direction,
            inflation_direction: state.inflation_direction,
            days_in_regime: state.days_in_regime,
            last_change: state.last_change.format("%Y-%m-%dT00:00:00Z").to_string(),
            confidence: round_to(state.confidence, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalsReport {
    pub signals: Vec<SignalEntry>,
    pub regime: RegimeEntry,
    pub generated_at: String,
}

impl SignalsReport {
    pub fn new(allocation: &Allocation, generated_at: DateTime<Utc>) -> Self {
        let signals = allocation
            .signals
            .iter()
            .map(|s| SignalEntry {
                asset: s.asset.clone(),
                signal: s.signal,
                target_allocation: round_to(s.target_allocation, 4),
                conviction: s.conviction,
                category: s.category,
                quadrant: s.quadrant,
            })
            .collect();
        SignalsReport {
            signals,
            regime: RegimeEntry::from(&allocation.regime),
            generated_at: timestamp(generated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub total_return: f64,
    pub annual_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub final_value: f64,
}

impl From<&Metrics> for SummaryEntry {
    fn from(m: &Metrics) -> Self {
        SummaryEntry {
            total_return: pct(m.total_return),
            annual_return: pct(m.annual_return),
            sharpe: round_to(m.sharpe, 2),
            max_drawdown: pct(m.max_drawdown),
            final_value: round_to(m.final_value, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub value: f64,
    pub total_return: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceSampling {
    Daily,
    /// Last point of each calendar month.
    MonthEnd,
}

pub fn performance_series(
    nav_curve: &[NavPoint],
    initial_capital: f64,
    sampling: PerformanceSampling,
) -> Vec<PerformancePoint> {
    let point = |p: &NavPoint| PerformancePoint {
        date: p.date,
        value: round_to(p.value, 2),
        total_return: if initial_capital > 0.0 {
            pct(p.value / initial_capital - 1.0)
        } else {
            0.0
        },
    };

    match sampling {
        PerformanceSampling::Daily => nav_curve.iter().map(point).collect(),
        PerformanceSampling::MonthEnd => nav_curve
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                nav_curve
                    .get(i + 1)
                    .is_none_or(|next| (next.date.year(), next.date.month()) != (p.date.year(), p.date.month()))
            })
            .map(|(_, p)| point(p))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    pub summary: SummaryEntry,
    pub performance: Vec<PerformancePoint>,
    pub generated_at: String,
}

impl BacktestReport {
    pub fn new(result: &BacktestResult, generated_at: DateTime<Utc>) -> Self {
        BacktestReport {
            summary: SummaryEntry::from(&result.metrics()),
            performance: performance_series(
                &result.nav_curve,
                result.initial_capital,
                PerformanceSampling::Daily,
            ),
            generated_at: timestamp(generated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    pub events: Vec<HistoryEvent>,
    pub performance: Vec<PerformancePoint>,
    pub summary: SummaryEntry,
    pub generated_at: String,
}

impl HistoryReport {
    pub fn new(result: &BacktestResult, events: Vec<HistoryEvent>, generated_at: DateTime<Utc>) -> Self {
        HistoryReport {
            events,
            performance: performance_series(
                &result.nav_curve,
                result.initial_capital,
                PerformanceSampling::MonthEnd,
            ),
            summary: SummaryEntry::from(&result.metrics()),
            generated_at: timestamp(generated_at),
        }
    }
}
