//! Portfolio state, NAV tracking and rebalancing.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::momentum::AssetScore;
use super::position::{Position, TradeEvent, TradeKind};
use super::stop_loss::StopLossManager;

/// Weight changes smaller than this are not traded.
const WEIGHT_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceRecord {
    pub date: NaiveDate,
    /// Σ |target - held| over the union of symbols.
    pub turnover: f64,
    pub trades: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub initial_capital: f64,
    pub nav: f64,
    pub positions: BTreeMap<String, Position>,
    pub nav_curve: Vec<NavPoint>,
    pub trade_log: Vec<TradeEvent>,
    pub rebalances: Vec<RebalanceRecord>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            initial_capital,
            nav: initial_capital,
            positions: BTreeMap::new(),
            nav_curve: Vec::new(),
            trade_log: Vec::new(),
            rebalances: Vec::new(),
        }
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn remove_position(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.positions
            .iter()
            .map(|(s, p)| (s.clone(), p.weight))
            .collect()
    }

    pub fn total_leverage(&self) -> f64 {
        self.positions.values().map(|p| p.weight).sum()
    }

    /// Grow NAV by the weighted return of the book held going into `date`.
    pub fn advance_nav<F>(&mut self, date: NaiveDate, daily_return: F) -> f64
    where
        F: Fn(&str) -> f64,
    {
        let growth: f64 = self
            .positions
            .values()
            .map(|p| p.weight * daily_return(&p.symbol))
            .sum();
        self.nav *= 1.0 + growth;
        self.record_nav(date, self.nav);
        growth
    }

    pub fn record_nav(&mut self, date: NaiveDate, value: f64) {
        self.nav_curve.push(NavPoint { date, value });
    }

    /// Move the book to `targets`, opening, resizing and closing positions.
    ///
    /// Prices and ATRs come from `scores`; a target without a score is skipped.
    pub fn rebalance(
        &mut self,
        date: NaiveDate,
        targets: &BTreeMap<String, f64>,
        scores: &BTreeMap<String, AssetScore>,
        stops: &StopLossManager,
    ) -> Vec<TradeEvent> {
        let mut events = Vec::new();

        let exits: Vec<String> = self
            .positions
            .keys()
            .filter(|s| targets.get(*s).is_none_or(|w| *w <= 0.0))
            .cloned()
            .collect();
        for symbol in exits {
            if let Some(pos) = self.remove_position(&symbol) {
                let price = scores.get(&symbol).map_or(pos.high_water_mark, |s| s.close);
                events.push(TradeEvent {
                    date,
                    symbol,
                    kind: TradeKind::Exit,
                    weight_before: pos.weight,
                    weight_after: 0.0,
                    price,
                });
            }
        }

        for (symbol, &target) in targets.iter().filter(|(_, w)| **w > 0.0) {
            let Some(score) = scores.get(symbol) else {
                tracing::warn!(date = %date, symbol = %symbol, "no price for target, skipping");
                continue;
            };
            match self.positions.get_mut(symbol) {
                Some(pos) => {
                    if (pos.weight - target).abs() > WEIGHT_TOLERANCE {
                        events.push(TradeEvent {
                            date,
                            symbol: symbol.clone(),
                            kind: TradeKind::Reweight,
                            weight_before: pos.weight,
                            weight_after: target,
                            price: score.close,
                        });
                        pos.weight = target;
                    }
                }
                None => {
                    let stop = stops.initial_stop(score.close, score.atr);
                    self.add_position(Position::open(symbol, target, date, score.close, stop));
                    events.push(TradeEvent {
                        date,
                        symbol: symbol.clone(),
                        kind: TradeKind::Entry,
                        weight_before: 0.0,
                        weight_after: target,
                        price: score.close,
                    });
                }
            }
        }

        events
    }

    /// Append the day's trades to the log and record the rebalance if anything moved.
    pub fn record_rebalance(&mut self, date: NaiveDate, turnover: f64, events: Vec<TradeEvent>) {
        if events.is_empty() && turnover <= WEIGHT_TOLERANCE {
            return;
        }
        for ev in &events {
            tracing::debug!(
                date = %date,
                symbol = %ev.symbol,
                kind = %ev.kind,
                weight_change = ev.weight_change(),
                "trade"
            );
        }
        self.rebalances.push(RebalanceRecord {
            date,
            turnover,
            trades: events.len(),
        });
        self.trade_log.extend(events);
    }
}

/// Σ |after - before| over every symbol in either book.
pub fn turnover(before: &BTreeMap<String, f64>, after: &BTreeMap<String, f64>) -> f64 {
    let symbols: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    symbols
        .into_iter()
        .map(|s| {
            let b = before.get(s).copied().unwrap_or(0.0);
            let a = after.get(s).copied().unwrap_or(0.0);
            (a - b).abs()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stop_loss::StopLossConfig;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn score(close: f64) -> AssetScore {
        AssetScore {
            close,
            momentum: Some(5.0),
            above_trend: true,
            volatility: Some(0.2),
            atr: Some(2.0),
        }
    }

    fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(s, w)| (s.to_string(), *w)).collect()
    }

    fn scores(entries: &[(&str, f64)]) -> BTreeMap<String, AssetScore> {
        entries.iter().map(|(s, c)| (s.to_string(), score(*c))).collect()
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(50_000.0);
        assert!((portfolio.nav - 50_000.0).abs() < f64::EPSILON);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.nav_curve.is_empty());
        assert!(portfolio.trade_log.is_empty());
    }

    #[test]
    fn add_and_remove_position() {
        let mut portfolio = Portfolio::new(50_000.0);
        portfolio.add_position(Position::open("QQQ", 0.5, date(1), 100.0, None));

        assert_eq!(portfolio.position_count(), 1);
        assert!((portfolio.positions["QQQ"].weight - 0.5).abs() < f64::EPSILON);

        assert!(portfolio.remove_position("QQQ").is_some());
        assert_eq!(portfolio.position_count(), 0);
        assert!(portfolio.remove_position("QQQ").is_none());
    }

    #[test]
    fn advance_nav_uses_held_weights() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.add_position(Position::open("QQQ", 0.5, date(1), 100.0, None));
        portfolio.add_position(Position::open("TLT", 1.0, date(1), 100.0, None));

        let growth = portfolio.advance_nav(date(2), |s| if s == "QQQ" { 0.10 } else { -0.02 });

        assert!((growth - 0.03).abs() < 1e-12);
        assert!((portfolio.nav - 1030.0).abs() < 1e-9);
        assert_eq!(portfolio.nav_curve.len(), 1);
        assert_eq!(portfolio.nav_curve[0].date, date(2));
    }

    #[test]
    fn rebalance_opens_resizes_and_closes() {
        let stops = StopLossManager::new(StopLossConfig::default());
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.add_position(Position::open("QQQ", 0.5, date(1), 100.0, None));
        portfolio.add_position(Position::open("TLT", 0.5, date(1), 100.0, None));

        let events = portfolio.rebalance(
            date(2),
            &weights(&[("QQQ", 0.8), ("GLD", 0.7)]),
            &scores(&[("QQQ", 105.0), ("TLT", 99.0), ("GLD", 50.0)]),
            &stops,
        );

        let kinds: Vec<(String, TradeKind)> = events.iter().map(|e| (e.symbol.clone(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("TLT".to_string(), TradeKind::Exit),
                ("GLD".to_string(), TradeKind::Entry),
                ("QQQ".to_string(), TradeKind::Reweight),
            ]
        );
        let gld = &portfolio.positions["GLD"];
        assert_eq!(gld.stop_price, Some(46.0));
        assert!((portfolio.total_leverage() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn rebalance_unchanged_weights_is_quiet() {
        let stops = StopLossManager::default();
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.add_position(Position::open("QQQ", 0.5, date(1), 100.0, None));

        let events = portfolio.rebalance(date(2), &weights(&[("QQQ", 0.5)]), &scores(&[("QQQ", 101.0)]), &stops);
        assert!(events.is_empty());
    }

    #[test]
    fn turnover_over_union() {
        let before = weights(&[("QQQ", 0.5), ("TLT", 0.5)]);
        let after = weights(&[("QQQ", 0.8), ("GLD", 0.7)]);
        // |0.3| + |0.5| + |0.7|
        assert!((turnover(&before, &after) - 1.5).abs() < 1e-12);
        assert_eq!(turnover(&before, &before), 0.0);
    }

    #[test]
    fn record_rebalance_skips_idle_days() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.record_rebalance(date(2), 0.0, Vec::new());
        assert!(portfolio.rebalances.is_empty());

        let ev = TradeEvent {
            date: date(3),
            symbol: "QQQ".into(),
            kind: TradeKind::Entry,
            weight_before: 0.0,
            weight_after: 0.5,
            price: 100.0,
        };
        portfolio.record_rebalance(date(3), 0.5, vec![ev]);
        assert_eq!(portfolio.rebalances.len(), 1);
        assert_eq!(portfolio.rebalances[0].trades, 1);
        assert_eq!(portfolio.trade_log.len(), 1);
    }
}
