//! Batch indicator computation over one asset's bars.

use std::collections::HashMap;

use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::roc::calculate_roc;
use crate::domain::indicator::volatility::calculate_volatility;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_indicator(bars: &[OhlcvBar], indicator_type: &IndicatorType) -> IndicatorSeries {
    match *indicator_type {
        IndicatorType::Ema(period) => calculate_ema(bars, period),
        IndicatorType::Roc(period) => calculate_roc(bars, period),
        IndicatorType::Atr(period) => calculate_atr(bars, period),
        IndicatorType::Volatility(period) => calculate_volatility(bars, period),
    }
}

/// Compute each distinct requested indicator once.
pub fn compute_indicators(
    bars: &[OhlcvBar],
    types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::with_capacity(types.len());
    for t in types {
        if !out.contains_key(t) {
            out.insert(t.clone(), calculate_indicator(bars, t));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                OhlcvBar {
                    symbol: "TEST".into(),
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000,
                }
            })
            .collect()
    }

    #[test]
    fn computes_each_requested_type() {
        let bars = make_bars(30);
        let types = vec![
            IndicatorType::Roc(20),
            IndicatorType::Ema(10),
            IndicatorType::Atr(14),
            IndicatorType::Volatility(5),
        ];
        let map = compute_indicators(&bars, &types);

        assert_eq!(map.len(), 4);
        for t in &types {
            let series = &map[t];
            assert_eq!(&series.indicator_type, t);
            assert_eq!(series.values.len(), 30);
        }
    }

    #[test]
    fn duplicate_types_computed_once() {
        let bars = make_bars(5);
        let map = compute_indicators(&bars, &[IndicatorType::Roc(1), IndicatorType::Roc(1)]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn dispatch_matches_direct_call() {
        let bars = make_bars(20);
        let via_dispatch = calculate_indicator(&bars, &IndicatorType::Atr(5));
        let direct = calculate_atr(&bars, 5);
        assert_eq!(via_dispatch.values, direct.values);
    }
}
