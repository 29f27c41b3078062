//! Core domain types and logic.

pub mod ohlcv;
pub mod error;
pub mod macro_series;
pub mod quadrant;
pub mod regime;
pub mod indicator;
pub mod indicator_helpers;
pub mod asset_history;
pub mod momentum;
pub mod allocation;
pub mod position;
pub mod stop_loss;
pub mod portfolio;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod events;
pub mod signals;
pub mod report;
pub mod config_validation;
pub mod universe;
