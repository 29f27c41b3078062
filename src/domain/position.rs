//! Open positions and the trade events that change them.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Fraction of NAV; the sum over positions is the gross leverage.
    pub weight: f64,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    /// Highest close since entry.
    pub high_water_mark: f64,
    pub stop_price: Option<f64>,
}

impl Position {
    pub fn open(symbol: &str, weight: f64, date: NaiveDate, price: f64, stop_price: Option<f64>) -> Self {
        Position {
            symbol: symbol.to_string(),
            weight,
            entry_date: date,
            entry_price: price,
            high_water_mark: price,
            stop_price,
        }
    }

    pub fn unrealized_return(&self, price: f64) -> f64 {
        if self.entry_price > 0.0 {
            price / self.entry_price - 1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Entry,
    Exit,
    StopOut,
    Reweight,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::Entry => f.write_str("entry"),
            TradeKind::Exit => f.write_str("exit"),
            TradeKind::StopOut => f.write_str("stop_out"),
            TradeKind::Reweight => f.write_str("reweight"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub symbol: String,
    pub kind: TradeKind,
    pub weight_before: f64,
    pub weight_after: f64,
    pub price: f64,
}

impl TradeEvent {
    pub fn weight_change(&self) -> f64 {
        self.weight_after - self.weight_before
    }
}
