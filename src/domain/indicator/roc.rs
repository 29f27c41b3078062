//! Rate of change over a trailing window, the momentum score.
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! Warmup: first n bars invalid. A zero base close leaves the point invalid
//! rather than reporting a fake 0% move.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_roc(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Roc(period));
    }

    let mut values = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let base = if i >= period {
            Some(bars[i - period].close)
        } else {
            None
        };

        let (valid, value) = match base {
            Some(prev_close) if prev_close != 0.0 => {
                (true, ((bars[i].close - prev_close) / prev_close) * 100.0)
            }
            _ => (false, f64::NAN),
        };

        values.push(IndicatorPoint {
            date: bars[i].date,
            valid,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Roc(period),
        values,
    }
}
