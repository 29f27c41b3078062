//! ATR trailing stops.
//!
//! stop = max(previous stop, high-water mark - ATR * multiplier). The stop
//! only ever ratchets up; a close at or below it exits the position.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::momentum::AssetScore;
use crate::domain::position::{Position, TradeEvent, TradeKind};

#[derive(Debug, Clone, PartialEq)]
pub struct StopLossConfig {
    pub atr_period: usize,
    /// ATR multiple below the high-water mark; <= 0 disables stops.
    pub multiplier: f64,
}

impl Default for StopLossConfig {
    fn default() -> Self {
        StopLossConfig {
            atr_period: 14,
            multiplier: 2.0,
        }
    }
}

impl StopLossConfig {
    pub fn enabled(&self) -> bool {
        self.multiplier > 0.0 && self.atr_period > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct StopLossManager {
    pub config: StopLossConfig,
}

impl StopLossManager {
    pub fn new(config: StopLossConfig) -> Self {
        StopLossManager { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled()
    }

    pub fn initial_stop(&self, entry_price: f64, atr: Option<f64>) -> Option<f64> {
        if !self.enabled() {
            return None;
        }
        atr.map(|a| entry_price - a * self.config.multiplier)
    }

    /// Raise the high-water mark and trail the stop behind it.
    pub fn ratchet(&self, position: &mut Position, close: f64, atr: Option<f64>) {
        position.high_water_mark = position.high_water_mark.max(close);
        if !self.enabled() {
            return;
        }
        if let Some(a) = atr {
            let trailing = position.high_water_mark - a * self.config.multiplier;
            position.stop_price = Some(match position.stop_price {
                Some(prev) => prev.max(trailing),
                None => trailing,
            });
        }
    }

    pub fn is_breached(&self, position: &Position, close: f64) -> bool {
        self.enabled() && position.stop_price.is_some_and(|stop| close <= stop)
    }

    /// Ratchet every open position to today's close and remove the breached ones.
    pub fn apply(
        &self,
        positions: &mut BTreeMap<String, Position>,
        scores: &BTreeMap<String, AssetScore>,
        date: NaiveDate,
    ) -> Vec<TradeEvent> {
        let mut stopped = Vec::new();

        for (symbol, position) in positions.iter_mut() {
            let Some(score) = scores.get(symbol) else {
                continue;
            };
            self.ratchet(position, score.close, score.atr);
            if self.is_breached(position, score.close) {
                tracing::info!(
                    date = %date,
                    symbol = %symbol,
                    close = score.close,
                    stop = position.stop_price.unwrap_or_default(),
                    unrealized_return = position.unrealized_return(score.close),
                    "stop-loss triggered"
                );
                stopped.push(TradeEvent {
                    date,
                    symbol: symbol.clone(),
                    kind: TradeKind::StopOut,
                    weight_before: position.weight,
                    weight_after: 0.0,
                    price: score.close,
                });
            }
        }

        for event in &stopped {
            positions.remove(&event.symbol);
        }
        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn score(close: f64, atr: Option<f64>) -> AssetScore {
        AssetScore {
            close,
            momentum: Some(1.0),
            above_trend: true,
            volatility: None,
            atr,
        }
    }

    fn manager(multiplier: f64) -> StopLossManager {
        StopLossManager::new(StopLossConfig {
            atr_period: 14,
            multiplier,
        })
    }

    #[test]
    fn default_config() {
        let c = StopLossConfig::default();
        assert_eq!(c.atr_period, 14);
        assert!((c.multiplier - 2.0).abs() < f64::EPSILON);
        assert!(c.enabled());
    }

    #[test]
    fn initial_stop_below_entry() {
        let m = manager(2.0);
        assert_eq!(m.initial_stop(100.0, Some(3.0)), Some(94.0));
        assert_eq!(m.initial_stop(100.0, None), None);
    }

    #[test]
    fn disabled_when_multiplier_not_positive() {
        let m = manager(0.0);
        assert!(!m.enabled());
        assert_eq!(m.initial_stop(100.0, Some(3.0)), None);

        let mut pos = Position::open("QQQ", 0.5, date(1), 100.0, None);
        m.ratchet(&mut pos, 120.0, Some(3.0));
        assert_eq!(pos.stop_price, None);
        assert!((pos.high_water_mark - 120.0).abs() < f64::EPSILON);
        assert!(!m.is_breached(&pos, 0.0));
    }

    #[test]
    fn stop_trails_high_water_mark() {
        let m = manager(2.0);
        let mut pos = Position::open("QQQ", 0.5, date(1), 100.0, Some(94.0));

        m.ratchet(&mut pos, 110.0, Some(3.0));
        assert_eq!(pos.stop_price, Some(104.0));
    }

    #[test]
    fn stop_never_moves_down() {
        let m = manager(2.0);
        let mut pos = Position::open("QQQ", 0.5, date(1), 100.0, Some(94.0));

        m.ratchet(&mut pos, 110.0, Some(3.0));
        // wider ATR and a lower close would pull the raw stop down
        m.ratchet(&mut pos, 105.0, Some(6.0));
        assert_eq!(pos.stop_price, Some(104.0));
        assert!((pos.high_water_mark - 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn breach_is_inclusive() {
        let m = manager(2.0);
        let pos = Position::open("QQQ", 0.5, date(1), 100.0, Some(94.0));
        assert!(m.is_breached(&pos, 94.0));
        assert!(!m.is_breached(&pos, 94.01));
    }

    #[test]
    fn apply_removes_breached_positions() {
        let m = manager(2.0);
        let mut positions = BTreeMap::new();
        positions.insert("QQQ".to_string(), Position::open("QQQ", 0.6, date(1), 100.0, Some(96.0)));
        positions.insert("TLT".to_string(), Position::open("TLT", 0.4, date(1), 90.0, Some(85.0)));

        let mut scores = BTreeMap::new();
        scores.insert("QQQ".to_string(), score(95.0, Some(2.0)));
        scores.insert("TLT".to_string(), score(91.0, Some(1.0)));

        let events = m.apply(&mut positions, &scores, date(2));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].symbol, "QQQ");
        assert_eq!(events[0].kind, TradeKind::StopOut);
        assert!((events[0].weight_before - 0.6).abs() < f64::EPSILON);
        assert_eq!(events[0].weight_after, 0.0);
        assert!(!positions.contains_key("QQQ"));
        // TLT ratcheted: max(85, 91 - 2) = 89
        assert_eq!(positions["TLT"].stop_price, Some(89.0));
    }

    #[test]
    fn apply_skips_positions_without_scores() {
        let m = manager(2.0);
        let mut positions = BTreeMap::new();
        positions.insert("GLD".to_string(), Position::open("GLD", 0.3, date(1), 100.0, Some(99.0)));

        let events = m.apply(&mut positions, &BTreeMap::new(), date(2));
        assert!(events.is_empty());
        assert!(positions.contains_key("GLD"));
    }
}
