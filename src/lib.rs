//! quadtrader: macro quadrant regime classification, quadrant-driven
//! allocation, and day-by-day historical replay with ATR trailing stops.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command line in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
