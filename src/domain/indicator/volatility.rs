//! Realized volatility of daily close-to-close returns.
//!
//! VOL(n)[i] = population stddev of the last n daily returns * sqrt(252).
//! Warmup: first n bars are invalid (n returns need n+1 closes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub fn calculate_volatility(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Volatility(period));
    }

    let returns: Vec<f64> = bars
        .windows(2)
        .map(|w| w[1].return_from(w[0].close))
        .collect();

    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let valid = i >= period;

        let value = if valid {
            // returns[j] is the move into bar j+1
            let window = &returns[i - period..i];
            let mean: f64 = window.iter().sum::<f64>() / period as f64;
            let variance: f64 = window
                .iter()
                .map(|r| {
                    let diff = r - mean;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Volatility(period),
        values,
    }
}
