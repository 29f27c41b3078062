//! Performance analytics over a NAV series.

use super::portfolio::NavPoint;
use super::position::{TradeEvent, TradeKind};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annual_return: f64,
    pub sharpe: f64,
    /// Annualized stdev of daily returns.
    pub volatility: f64,
    /// Worst peak-to-trough decline, as a non-positive fraction.
    pub max_drawdown: f64,
    /// Longest run of points spent below a prior peak.
    pub max_drawdown_duration: i64,
    pub final_value: f64,
    pub trading_days: usize,
}

impl Metrics {
    pub fn compute(nav_curve: &[NavPoint], initial_capital: f64) -> Self {
        let final_value = nav_curve.last().map(|p| p.value).unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            final_value / initial_capital - 1.0
        } else {
            0.0
        };

        let trading_days = nav_curve.len();
        let annual_return = if trading_days > 0 && initial_capital > 0.0 && final_value > 0.0 {
            (final_value / initial_capital).powf(TRADING_DAYS_PER_YEAR / trading_days as f64) - 1.0
        } else {
            0.0
        };

        let returns = daily_returns(nav_curve);
        let (sharpe, volatility) = compute_risk_adjusted(&returns);
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(nav_curve);

        Metrics {
            total_return,
            annual_return,
            sharpe,
            volatility,
            max_drawdown,
            max_drawdown_duration,
            final_value,
            trading_days,
        }
    }
}

/// Day-over-day NAV changes; the first point has no predecessor and is excluded.
pub fn daily_returns(nav_curve: &[NavPoint]) -> Vec<f64> {
    nav_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].value;
            if prev > 0.0 { w[1].value / prev - 1.0 } else { 0.0 }
        })
        .collect()
}

fn compute_drawdown(nav_curve: &[NavPoint]) -> (f64, i64) {
    let Some(first) = nav_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.value;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in nav_curve {
        if point.value >= peak {
            peak = point.value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (point.value - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

/// (Sharpe, annualized volatility) from daily returns, using the sample stdev.
fn compute_risk_adjusted(returns: &[f64]) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    // flat series leave rounding noise in the variance
    if stddev <= f64::EPSILON {
        return (0.0, 0.0);
    }

    let annualizer = TRADING_DAYS_PER_YEAR.sqrt();
    ((mean / stddev) * annualizer, stddev * annualizer)
}

/// Counts of trade events by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeStats {
    pub entries: usize,
    pub exits: usize,
    pub stop_outs: usize,
    pub reweights: usize,
}

impl TradeStats {
    pub fn compute(trades: &[TradeEvent]) -> Self {
        let mut stats = TradeStats::default();
        for t in trades {
            match t.kind {
                TradeKind::Entry => stats.entries += 1,
                TradeKind::Exit => stats.exits += 1,
                TradeKind::StopOut => stats.stop_outs += 1,
                TradeKind::Reweight => stats.reweights += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.entries + self.exits + self.stop_outs + self.reweights
    }
}
