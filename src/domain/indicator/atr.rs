//! Average True Range (Wilder smoothing), used to size trailing stops.
//!
//! TR[0] = high - low, TR[i] = true_range(prev close).
//! ATR seed = mean(TR[0..n]), then ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Atr(period));
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            results.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: 0.0,
            });
            continue;
        }

        atr = if i + 1 == period {
            tr_values[0..=i].iter().sum::<f64>() / period as f64
        } else {
            (atr * (period - 1) as f64 + tr_values[i]) / period as f64
        };

        results.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: atr,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            symbol: "TEST".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn atr_warmup() {
        let bars: Vec<OhlcvBar> = (1..=5).map(|d| make_bar(d, 110.0, 90.0, 100.0)).collect();
        let series = calculate_atr(&bars, 3);

        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn atr_seed_is_average() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
        ];
        let series = calculate_atr(&bars, 3);
        // TR: 10, max(10, 10, 0)=10, max(10, 10, 0)=10
        assert!((series.value_at(2).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            make_bar(1, 102.0, 98.0, 100.0),
            make_bar(2, 102.0, 98.0, 100.0),
            make_bar(3, 110.0, 90.0, 100.0),
        ];
        let series = calculate_atr(&bars, 2);
        // seed = (4 + 4) / 2 = 4; next = (4*1 + 20) / 2 = 12
        assert!((series.value_at(1).unwrap() - 4.0).abs() < 1e-9);
        assert!((series.value_at(2).unwrap() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn atr_short_history_all_invalid() {
        let bars = vec![make_bar(1, 110.0, 90.0, 100.0)];
        let series = calculate_atr(&bars, 14);
        assert_eq!(series.value_at(0), None);
    }
}
