//! History feed: regime transitions and notable weight changes, newest first.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::backtest::WeightSnapshot;
use crate::domain::quadrant::Quadrant;
use crate::domain::regime::RegimeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Regime,
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventIcon {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEvent {
    pub id: usize,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub title: String,
    pub description: String,
    pub icon: EventIcon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventFeedConfig {
    /// Minimum weight for a position to count as newly opened.
    pub entry_threshold: f64,
    /// Weight below which a position counts as closed.
    pub exit_threshold: f64,
    /// Absolute weight change that counts as a re-weight.
    pub reweight_threshold: f64,
    /// Diff weights only on every n-th step.
    pub sample_every: usize,
    pub max_events: usize,
}

impl Default for EventFeedConfig {
    fn default() -> Self {
        EventFeedConfig {
            entry_threshold: 0.05,
            exit_threshold: 0.01,
            reweight_threshold: 0.10,
            sample_every: 5,
            max_events: 100,
        }
    }
}

fn regime_icon(primary: Quadrant) -> EventIcon {
    match primary {
        Quadrant::Q1 => EventIcon::Up,
        Quadrant::Q3 | Quadrant::Q4 => EventIcon::Down,
        Quadrant::Q2 => EventIcon::Neutral,
    }
}

type EventParts = (EventKind, String, String, EventIcon);

fn pct(w: f64) -> String {
    format!("{:.1}%", w * 100.0)
}

fn weight_events(
    date: NaiveDate,
    prev: &BTreeMap<String, f64>,
    current: &BTreeMap<String, f64>,
    config: &EventFeedConfig,
) -> Vec<EventParts> {
    let symbols: BTreeSet<&String> = prev.keys().chain(current.keys()).collect();
    let mut out = Vec::new();

    for symbol in symbols {
        let before = prev.get(symbol).copied().unwrap_or(0.0);
        let after = current.get(symbol).copied().unwrap_or(0.0);

        if after > config.entry_threshold && before < config.exit_threshold {
            out.push((
                EventKind::Signal,
                format!("New position: {} added", symbol),
                format!("Allocation: {}", pct(after)),
                EventIcon::Up,
            ));
        } else if after < config.exit_threshold && before > config.entry_threshold {
            out.push((
                EventKind::Signal,
                format!("Position exited: {}", symbol),
                format!("Removed from portfolio (was {})", pct(before)),
                EventIcon::Down,
            ));
        } else if (after - before).abs() > config.reweight_threshold {
            let (direction, icon) = if after > before {
                ("increased", EventIcon::Up)
            } else {
                ("decreased", EventIcon::Down)
            };
            out.push((
                EventKind::Signal,
                format!("{} allocation {}", symbol, direction),
                format!("{} → {}", pct(before), pct(after)),
                icon,
            ));
        }
    }

    tracing::trace!(date = %date, events = out.len(), "weight diff");
    out
}

/// Build the feed from aligned regime and weight histories.
pub fn build_event_feed(
    regimes: &[RegimeState],
    snapshots: &[WeightSnapshot],
    config: &EventFeedConfig,
) -> Vec<HistoryEvent> {
    let weights_by_date: BTreeMap<NaiveDate, &BTreeMap<String, f64>> =
        snapshots.iter().map(|s| (s.date, &s.weights)).collect();
    let sample_every = config.sample_every.max(1);

    let mut events: Vec<HistoryEvent> = Vec::new();
    let mut push = |date: NaiveDate, (kind, title, description, icon): EventParts| {
        events.push(HistoryEvent {
            id: 0,
            date,
            kind,
            title,
            description,
            icon,
        });
    };

    let mut prev_regime: Option<(Quadrant, Quadrant)> = None;
    let mut prev_weights: BTreeMap<String, f64> = BTreeMap::new();

    for (i, state) in regimes.iter().enumerate() {
        let current = (state.primary, state.secondary);
        if let Some((old_primary, _)) = prev_regime {
            if prev_regime != Some(current) {
                push(
                    state.as_of,
                    (
                        EventKind::Regime,
                        format!("Regime transition: {} → {}", old_primary, state.primary),
                        format!(
                            "Primary quadrant changed to {}, secondary is {}",
                            state.primary, state.secondary
                        ),
                        regime_icon(state.primary),
                    ),
                );
            }
        }
        prev_regime = Some(current);

        if i % sample_every != 0 {
            continue;
        }
        if let Some(weights) = weights_by_date.get(&state.as_of) {
            for ev in weight_events(state.as_of, &prev_weights, weights, config) {
                push(state.as_of, ev);
            }
            prev_weights = weights
                .iter()
                .filter(|(_, w)| **w > 0.0)
                .map(|(s, w)| (s.clone(), *w))
                .collect();
        }
    }

    // stable: same-date events keep creation order
    events.sort_by(|a, b| b.date.cmp(&a.date));
    events.truncate(config.max_events);
    for (i, ev) in events.iter_mut().enumerate() {
        ev.id = i + 1;
    }
    events
}
