//! Configuration validation.
//!
//! Validates every config field before a run starts, so a bad value fails
//! fast with the section and key that caused it.

use crate::domain::allocation::{AllocationConfig, AssetCategory, SignalThresholds, WeightingScheme};
use crate::domain::backtest::WarmupPolicy;
use crate::domain::error::QuadtraderError;
use crate::domain::momentum::MomentumConfig;
use crate::domain::quadrant::Quadrant;
use crate::domain::regime::{MAX_CONFIDENCE, RegimeConfig};
use crate::domain::stop_loss::StopLossConfig;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 50_000.0;

/// `[allocation] momentum_lookback`, falling back to its `momentum_days` alias.
pub fn momentum_lookback(config: &dyn ConfigPort) -> i64 {
    let default = MomentumConfig::default().lookback as i64;
    if config.get_string("allocation", "momentum_lookback").is_some() {
        config.get_int("allocation", "momentum_lookback", default)
    } else {
        config.get_int("allocation", "momentum_days", default)
    }
}

/// `[risk] stop_loss_atr_multiplier`, falling back to its `atr_stop_loss` alias.
pub fn atr_multiplier(config: &dyn ConfigPort) -> f64 {
    let default = StopLossConfig::default().multiplier;
    if config.get_string("risk", "stop_loss_atr_multiplier").is_some() {
        config.get_double("risk", "stop_loss_atr_multiplier", default)
    } else {
        config.get_double("risk", "atr_stop_loss", default)
    }
}

pub fn parse_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<NaiveDate, QuadtraderError> {
    match config.get_string(section, key) {
        None => Err(QuadtraderError::missing(section, key)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            QuadtraderError::invalid(section, key, format!("invalid {} format, expected YYYY-MM-DD", key))
        }),
    }
}

fn parse_optional<T: FromStr<Err = String>>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, QuadtraderError> {
    config
        .get_string(section, key)
        .map(|raw| raw.parse::<T>().map_err(|e| QuadtraderError::invalid(section, key, e)))
        .transpose()
}

pub fn warmup_policy(config: &dyn ConfigPort) -> Result<WarmupPolicy, QuadtraderError> {
    Ok(parse_optional(config, "backtest", "warmup_policy")?.unwrap_or_default())
}

pub fn weighting_scheme(config: &dyn ConfigPort) -> Result<WeightingScheme, QuadtraderError> {
    Ok(parse_optional(config, "allocation", "weighting")?.unwrap_or_default())
}

/// Data location and macro indicator names; needed by every command that reads prices.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => return Err(QuadtraderError::missing("data", "path")),
    }
    if config.get_list("regime", "growth_indicators").is_empty() {
        return Err(QuadtraderError::missing("regime", "growth_indicators"));
    }
    if config.get_list("regime", "inflation_indicators").is_empty() {
        return Err(QuadtraderError::missing("regime", "inflation_indicators"));
    }
    Ok(())
}

/// Historical window and capital.
pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    warmup_policy(config)?;
    Ok(())
}

/// Everything that shapes the strategy itself.
pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    validate_regime(config)?;
    validate_allocation(config)?;
    validate_risk(config)?;
    validate_signals(config)?;
    validate_allocation_table(config)?;
    validate_categories(config)?;
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if value <= 0.0 {
        return Err(QuadtraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    let start_date = parse_date(config, "backtest", "start_date")?;
    let end_date = parse_date(config, "backtest", "end_date")?;

    if start_date >= end_date {
        return Err(QuadtraderError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_regime(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    let defaults = RegimeConfig::default();
    for (key, default) in [
        ("trend_window", defaults.trend_window),
        ("smoothing_window", defaults.smoothing_window),
    ] {
        if config.get_int("regime", key, default as i64) < 1 {
            return Err(QuadtraderError::invalid("regime", key, format!("{} must be at least 1", key)));
        }
    }

    let base = config.get_double("regime", "confidence_base", defaults.confidence_base);
    if !(0.0..=MAX_CONFIDENCE).contains(&base) {
        return Err(QuadtraderError::invalid(
            "regime",
            "confidence_base",
            format!("confidence_base must be between 0 and {}", MAX_CONFIDENCE),
        ));
    }
    if config.get_double("regime", "confidence_scale", defaults.confidence_scale) <= 0.0 {
        return Err(QuadtraderError::invalid(
            "regime",
            "confidence_scale",
            "confidence_scale must be positive",
        ));
    }
    Ok(())
}

fn validate_allocation(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    let defaults = AllocationConfig::default();

    if momentum_lookback(config) < 1 {
        return Err(QuadtraderError::invalid(
            "allocation",
            "momentum_lookback",
            "momentum_lookback must be at least 1",
        ));
    }
    if config.get_int("allocation", "max_positions", defaults.max_positions as i64) < 1 {
        return Err(QuadtraderError::invalid(
            "allocation",
            "max_positions",
            "max_positions must be at least 1",
        ));
    }
    if config.get_double("allocation", "leverage", defaults.leverage) <= 0.0 {
        return Err(QuadtraderError::invalid("allocation", "leverage", "leverage must be positive"));
    }
    let ratio = config.get_double("allocation", "primary_ratio", defaults.primary_ratio);
    if ratio <= 0.5 || ratio > 1.0 {
        return Err(QuadtraderError::invalid(
            "allocation",
            "primary_ratio",
            "primary_ratio must be above 0.5 and at most 1",
        ));
    }

    let momentum = MomentumConfig::default();
    for (key, default) in [("ema_period", momentum.ema_period), ("vol_lookback", momentum.vol_lookback)] {
        if config.get_int("allocation", key, default as i64) < 0 {
            return Err(QuadtraderError::invalid("allocation", key, format!("{} must be non-negative", key)));
        }
    }

    if weighting_scheme(config)? == WeightingScheme::Volatility
        && config.get_int("allocation", "vol_lookback", momentum.vol_lookback as i64) == 0
    {
        return Err(QuadtraderError::invalid(
            "allocation",
            "vol_lookback",
            "volatility weighting needs vol_lookback of at least 1",
        ));
    }
    Ok(())
}

fn validate_risk(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    if atr_multiplier(config) < 0.0 {
        return Err(QuadtraderError::invalid(
            "risk",
            "stop_loss_atr_multiplier",
            "stop_loss_atr_multiplier must be non-negative",
        ));
    }
    if config.get_int("risk", "atr_period", StopLossConfig::default().atr_period as i64) < 1 {
        return Err(QuadtraderError::invalid("risk", "atr_period", "atr_period must be at least 1"));
    }
    Ok(())
}

fn validate_signals(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    let defaults = SignalThresholds::default();
    let bullish = config.get_double("signals", "bullish_threshold", defaults.bullish);
    let high = config.get_double("signals", "conviction_high", defaults.conviction_high);
    let medium = config.get_double("signals", "conviction_medium", defaults.conviction_medium);

    if bullish < 0.0 {
        return Err(QuadtraderError::invalid(
            "signals",
            "bullish_threshold",
            "bullish_threshold must be non-negative",
        ));
    }
    if medium < 0.0 || high < medium {
        return Err(QuadtraderError::invalid(
            "signals",
            "conviction_high",
            "conviction thresholds must satisfy 0 <= conviction_medium <= conviction_high",
        ));
    }
    Ok(())
}

fn validate_allocation_table(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    for key in config.section_keys("allocation_table") {
        key.parse::<Quadrant>()
            .map_err(|e| QuadtraderError::invalid("allocation_table", &key, e))?;
        if config.get_list("allocation_table", &key).is_empty() {
            return Err(QuadtraderError::invalid(
                "allocation_table",
                &key,
                "quadrant needs at least one symbol",
            ));
        }
    }
    Ok(())
}

fn validate_categories(config: &dyn ConfigPort) -> Result<(), QuadtraderError> {
    for key in config.section_keys("categories") {
        if let Some(raw) = config.get_string("categories", &key) {
            raw.trim()
                .parse::<AssetCategory>()
                .map_err(|e| QuadtraderError::invalid("categories", &key, e))?;
        }
    }
    Ok(())
}
