//! Macro indicator readings (growth and inflation proxies).
//!
//! A `MacroSeries` is an ordered, duplicate-free sequence of scalar readings.
//! All lookups are as-of: a query for date D only sees readings dated <= D.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use super::error::QuadtraderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroReading {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroSeries {
    name: String,
    readings: Vec<MacroReading>,
}

impl MacroSeries {
    /// Build a series, rejecting out-of-order or duplicate dates and non-finite values.
    pub fn new(name: impl Into<String>, readings: Vec<MacroReading>) -> Result<Self, QuadtraderError> {
        let name = name.into();
        for pair in readings.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(QuadtraderError::UnorderedSeries {
                    series: name,
                    date: pair[1].date,
                });
            }
        }
        if let Some(bad) = readings.iter().find(|r| !r.value.is_finite()) {
            return Err(QuadtraderError::Data {
                reason: format!("{} has a non-finite reading on {}", name, bad.date),
            });
        }
        Ok(Self { name, readings })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn readings(&self) -> &[MacroReading] {
        &self.readings
    }

    /// Readings dated on or before `date`.
    pub fn upto(&self, date: NaiveDate) -> &[MacroReading] {
        let end = self.readings.partition_point(|r| r.date <= date);
        &self.readings[..end]
    }

    /// Percentage divergence of the smoothed level from the trailing trend as of `date`.
    ///
    /// level = mean of the last `smoothing_window` readings, trend = mean of the last
    /// `trend_window` readings. Positive means the indicator is rising.
    pub fn divergence(
        &self,
        date: NaiveDate,
        smoothing_window: usize,
        trend_window: usize,
    ) -> Result<f64, QuadtraderError> {
        let window = self.upto(date);
        let need = trend_window.max(smoothing_window).max(1);
        if window.len() < need {
            return Err(QuadtraderError::InsufficientHistory {
                series: self.name.clone(),
                have: window.len(),
                need,
            });
        }

        let level = tail_mean(window, smoothing_window.max(1));
        let trend = tail_mean(window, need);

        if trend.abs() < f64::EPSILON {
            Ok(level - trend)
        } else {
            Ok((level - trend) / trend.abs() * 100.0)
        }
    }
}

fn tail_mean(window: &[MacroReading], n: usize) -> f64 {
    let tail = &window[window.len() - n..];
    tail.iter().map(|r| r.value).sum::<f64>() / n as f64
}

/// Growth and inflation proxies feeding the regime classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroInputs {
    pub growth: Vec<MacroSeries>,
    pub inflation: Vec<MacroSeries>,
}

impl MacroInputs {
    pub fn new(growth: Vec<MacroSeries>, inflation: Vec<MacroSeries>) -> Result<Self, QuadtraderError> {
        if growth.is_empty() {
            return Err(QuadtraderError::missing("regime", "growth_indicators"));
        }
        if inflation.is_empty() {
            return Err(QuadtraderError::missing("regime", "inflation_indicators"));
        }
        Ok(Self { growth, inflation })
    }

    /// Every reading date across all series, on or before `as_of`, ascending.
    pub fn dates_through(&self, as_of: NaiveDate) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> = self
            .growth
            .iter()
            .chain(self.inflation.iter())
            .flat_map(|s| s.upto(as_of).iter().map(|r| r.date))
            .collect();
        dates.into_iter().collect()
    }
}
