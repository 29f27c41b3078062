//! Regime classification: macro divergences to a ranked quadrant and a
//! carried-forward regime streak.

use chrono::NaiveDate;

use super::error::QuadtraderError;
use super::macro_series::{MacroInputs, MacroSeries};
use super::quadrant::{Direction, Quadrant, QuadrantScore};

pub const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeConfig {
    pub trend_window: usize,
    pub smoothing_window: usize,
    pub confidence_base: f64,
    pub confidence_scale: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        RegimeConfig {
            trend_window: 50,
            smoothing_window: 5,
            confidence_base: 0.5,
            confidence_scale: 20.0,
        }
    }
}

/// Regime as of one date, threaded explicitly from one step to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeState {
    pub as_of: NaiveDate,
    pub primary: Quadrant,
    pub secondary: Quadrant,
    pub growth_direction: Direction,
    pub inflation_direction: Direction,
    pub days_in_regime: u32,
    pub last_change: NaiveDate,
    pub confidence: f64,
}

impl RegimeState {
    /// Next state from today's score and yesterday's state (if any).
    pub fn advance(prev: Option<&RegimeState>, score: &QuadrantScore, config: &RegimeConfig) -> Self {
        let primary = score.primary();
        let secondary = score.secondary();

        let (days_in_regime, last_change) = match prev {
            Some(p) if p.primary == primary => (p.days_in_regime + 1, p.last_change),
            _ => (1, score.date),
        };

        let confidence = if config.confidence_scale > 0.0 {
            config.confidence_base + score.gap() / config.confidence_scale
        } else {
            config.confidence_base
        };

        RegimeState {
            as_of: score.date,
            primary,
            secondary,
            growth_direction: score.growth_direction(),
            inflation_direction: score.inflation_direction(),
            days_in_regime,
            last_change,
            confidence: confidence.clamp(0.0, MAX_CONFIDENCE),
        }
    }

    pub fn changed_from(&self, prev: Option<&RegimeState>) -> bool {
        prev.is_none_or(|p| p.primary != self.primary)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    pub config: RegimeConfig,
}

impl RegimeClassifier {
    pub fn new(config: RegimeConfig) -> Self {
        RegimeClassifier { config }
    }

    /// Mean divergence over the series in `group` that have enough history.
    fn axis_divergence(&self, group: &[MacroSeries], date: NaiveDate) -> Result<f64, QuadtraderError> {
        let mut sum = 0.0;
        let mut ready = 0usize;
        let mut first_err = None;

        for series in group {
            match series.divergence(date, self.config.smoothing_window, self.config.trend_window) {
                Ok(d) => {
                    sum += d;
                    ready += 1;
                }
                Err(e) if e.is_insufficient_history() => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if ready == 0 {
            return Err(first_err.unwrap_or(QuadtraderError::InsufficientHistory {
                series: "macro".into(),
                have: 0,
                need: self.config.trend_window,
            }));
        }
        Ok(sum / ready as f64)
    }

    pub fn score_at(&self, inputs: &MacroInputs, date: NaiveDate) -> Result<QuadrantScore, QuadtraderError> {
        let growth = self.axis_divergence(&inputs.growth, date)?;
        let inflation = self.axis_divergence(&inputs.inflation, date)?;
        Ok(QuadrantScore::from_divergence(date, growth, inflation))
    }

    pub fn classify(
        &self,
        inputs: &MacroInputs,
        date: NaiveDate,
        prev: Option<&RegimeState>,
    ) -> Result<(QuadrantScore, RegimeState), QuadtraderError> {
        let score = self.score_at(inputs, date)?;
        let state = RegimeState::advance(prev, &score, &self.config);

        if state.changed_from(prev) {
            match prev {
                Some(p) => tracing::info!(
                    date = %date,
                    from = %p.primary,
                    to = %state.primary,
                    "regime transition"
                ),
                None => tracing::debug!(date = %date, primary = %state.primary, "first regime"),
            }
        }

        Ok((score, state))
    }

    /// Regime as of `as_of`, replaying every macro date so the streak is real.
    pub fn current_regime(&self, inputs: &MacroInputs, as_of: NaiveDate) -> Result<RegimeState, QuadtraderError> {
        let mut dates = inputs.dates_through(as_of);
        if dates.last() != Some(&as_of) {
            dates.push(as_of);
        }

        let mut state: Option<RegimeState> = None;
        let mut warmup_err = None;

        for date in dates {
            match self.classify(inputs, date, state.as_ref()) {
                Ok((_, next)) => state = Some(next),
                Err(e) if e.is_insufficient_history() => warmup_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        state.ok_or_else(|| {
            warmup_err.unwrap_or(QuadtraderError::InsufficientHistory {
                series: "macro".into(),
                have: 0,
                need: self.config.trend_window,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::macro_series::MacroReading;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn series(name: &str, values: &[f64]) -> MacroSeries {
        let readings = values
            .iter()
            .enumerate()
            .map(|(i, &value)| MacroReading {
                date: day(i as i64),
                value,
            })
            .collect();
        MacroSeries::new(name, readings).unwrap()
    }

    fn small_config() -> RegimeConfig {
        RegimeConfig {
            trend_window: 3,
            smoothing_window: 1,
            ..RegimeConfig::default()
        }
    }

    fn inputs(growth: &[f64], inflation: &[f64]) -> MacroInputs {
        MacroInputs::new(vec![series("GDP", growth)], vec![series("CPI", inflation)]).unwrap()
    }

    #[test]
    fn default_config() {
        let c = RegimeConfig::default();
        assert_eq!(c.trend_window, 50);
        assert_eq!(c.smoothing_window, 5);
        assert!((c.confidence_base - 0.5).abs() < f64::EPSILON);
        assert!((c.confidence_scale - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn classify_goldilocks() {
        let classifier = RegimeClassifier::new(small_config());
        let input = inputs(&[100.0, 101.0, 102.0], &[100.0, 99.0, 98.0]);

        let (score, state) = classifier.classify(&input, day(2), None).unwrap();
        assert!(score.growth > 0.0);
        assert!(score.inflation < 0.0);
        assert_eq!(state.primary, Quadrant::Q1);
        assert_eq!(state.growth_direction, Direction::Rising);
        assert_eq!(state.inflation_direction, Direction::Falling);
        assert_eq!(state.days_in_regime, 1);
        assert_eq!(state.last_change, day(2));
    }

    #[test]
    fn flat_growth_with_falling_inflation() {
        let classifier = RegimeClassifier::new(small_config());
        let input = inputs(&[100.0, 100.0, 100.0], &[100.0, 99.0, 98.0]);

        let (score, state) = classifier.classify(&input, day(2), None).unwrap();
        assert_eq!(score.growth, 0.0);
        assert_eq!(state.primary, Quadrant::Q4);
        assert_eq!(state.secondary, Quadrant::Q1);
        assert_eq!(state.growth_direction, Direction::Falling);
        assert_eq!(state.inflation_direction, Direction::Falling);
    }

    #[test]
    fn falling_growth_with_flat_inflation() {
        let classifier = RegimeClassifier::new(small_config());
        let input = inputs(&[102.0, 101.0, 100.0], &[2.0, 2.0, 2.0]);

        let (score, state) = classifier.classify(&input, day(2), None).unwrap();
        assert_eq!(score.inflation, 0.0);
        assert_eq!(state.primary, Quadrant::Q4);
        assert_eq!(state.secondary, Quadrant::Q3);
        assert_eq!(state.growth_direction, Direction::Falling);
        assert_eq!(state.inflation_direction, Direction::Falling);
    }

    #[test]
    fn equal_scores_break_ties_by_direction() {
        let config = RegimeConfig::default();
        let flat = QuadrantScore::from_divergence(day(0), 0.0, 0.0);
        let state = RegimeState::advance(None, &flat, &config);
        assert_eq!(state.primary, Quadrant::Q4);
        assert_eq!(state.secondary, Quadrant::Q1);
        assert!((state.confidence - config.confidence_base).abs() < f64::EPSILON);

        // rising growth with flat inflation: Q1 and Q2 tie, Q1 is defined by the signs
        let rising = QuadrantScore::from_divergence(day(1), 1.0, 0.0);
        let next = RegimeState::advance(Some(&state), &rising, &config);
        assert_eq!(next.primary, Quadrant::Q1);
        assert_eq!(next.secondary, Quadrant::Q2);
        assert_eq!(next.days_in_regime, 1);
        assert_eq!(next.last_change, day(1));
    }

    #[test]
    fn insufficient_history_fails() {
        let classifier = RegimeClassifier::new(small_config());
        let input = inputs(&[100.0, 101.0, 102.0], &[100.0, 99.0, 98.0]);

        let err = classifier.classify(&input, day(1), None).unwrap_err();
        assert!(err.is_insufficient_history());
    }

    #[test]
    fn proxies_without_history_are_ignored() {
        let classifier = RegimeClassifier::new(small_config());
        let growth = vec![series("GDP", &[100.0, 101.0, 102.0]), series("NEW", &[5.0])];
        let input = MacroInputs::new(growth, vec![series("CPI", &[1.0, 1.0, 1.0])]).unwrap();

        let score = classifier.score_at(&input, day(2)).unwrap();
        let only_gdp = series("GDP", &[100.0, 101.0, 102.0]).divergence(day(2), 1, 3).unwrap();
        assert!((score.growth - only_gdp).abs() < 1e-12);
    }

    #[test]
    fn streak_increments_and_resets() {
        let config = small_config();
        let d = |n| QuadrantScore::from_divergence(day(n), 1.0, -1.0);
        let s1 = RegimeState::advance(None, &d(0), &config);
        let s2 = RegimeState::advance(Some(&s1), &d(1), &config);
        assert_eq!(s2.days_in_regime, 2);
        assert_eq!(s2.last_change, day(0));

        let flipped = QuadrantScore::from_divergence(day(2), -1.0, -1.0);
        let s3 = RegimeState::advance(Some(&s2), &flipped, &config);
        assert_eq!(s3.primary, Quadrant::Q4);
        assert_eq!(s3.days_in_regime, 1);
        assert_eq!(s3.last_change, day(2));
    }

    #[test]
    fn confidence_is_capped() {
        let config = RegimeConfig::default();
        let wide = QuadrantScore::from_divergence(day(0), 50.0, -50.0);
        assert!((RegimeState::advance(None, &wide, &config).confidence - MAX_CONFIDENCE).abs() < f64::EPSILON);

        // gap between Q1 (3) and Q2 (1) is 2: 0.5 + 2/20 = 0.6
        let narrow = QuadrantScore::from_divergence(day(0), 2.0, -1.0);
        assert!((RegimeState::advance(None, &narrow, &config).confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn current_regime_replays_streak() {
        let classifier = RegimeClassifier::new(small_config());
        let input = inputs(
            &[100.0, 101.0, 102.0, 103.0, 104.0, 105.0],
            &[100.0, 99.0, 98.0, 97.0, 96.0, 95.0],
        );

        let state = classifier.current_regime(&input, day(5)).unwrap();
        assert_eq!(state.primary, Quadrant::Q1);
        // classifiable from day 2 through day 5
        assert_eq!(state.days_in_regime, 4);
        assert_eq!(state.last_change, day(2));
        assert_eq!(state.as_of, day(5));
    }

    #[test]
    fn current_regime_past_last_reading() {
        let classifier = RegimeClassifier::new(small_config());
        let input = inputs(&[100.0, 101.0, 102.0], &[100.0, 99.0, 98.0]);

        let state = classifier.current_regime(&input, day(10)).unwrap();
        assert_eq!(state.as_of, day(10));
        assert_eq!(state.days_in_regime, 2);
    }

    #[test]
    fn current_regime_without_history_errors() {
        let classifier = RegimeClassifier::new(small_config());
        let input = inputs(&[100.0], &[100.0]);
        assert!(classifier.current_regime(&input, day(0)).unwrap_err().is_insufficient_history());
    }

    #[test]
    fn classification_is_idempotent() {
        let classifier = RegimeClassifier::new(small_config());
        let input = inputs(&[100.0, 103.0, 101.0, 104.0], &[2.0, 2.5, 2.2, 2.9]);

        let a = classifier.current_regime(&input, day(3)).unwrap();
        let b = classifier.current_regime(&input, day(3)).unwrap();
        assert_eq!(a, b);
    }
}
