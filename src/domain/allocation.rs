//! Regime + momentum scores → target weights and per-asset signals.
//!
//! The primary quadrant gets `leverage * primary_ratio` of the budget and at
//! most `ceil(max_positions * primary_ratio)` names; the secondary quadrant
//! gets the rest of the budget and fills the remaining slots. Weights within a
//! quadrant are proportional to the weighting key of each selected name.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::momentum::AssetScore;
use crate::domain::quadrant::Quadrant;
use crate::domain::regime::RegimeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Growth,
    Crypto,
    Bonds,
    Commodities,
    Energy,
    Cyclicals,
    Defensive,
    RealAssets,
    Value,
    Core,
    HighBeta,
    Defi,
    Other,
}

impl AssetCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetCategory::Growth => "growth",
            AssetCategory::Crypto => "crypto",
            AssetCategory::Bonds => "bonds",
            AssetCategory::Commodities => "commodities",
            AssetCategory::Energy => "energy",
            AssetCategory::Cyclicals => "cyclicals",
            AssetCategory::Defensive => "defensive",
            AssetCategory::RealAssets => "real_assets",
            AssetCategory::Value => "value",
            AssetCategory::Core => "core",
            AssetCategory::HighBeta => "high_beta",
            AssetCategory::Defi => "defi",
            AssetCategory::Other => "other",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "growth" => Ok(AssetCategory::Growth),
            "crypto" => Ok(AssetCategory::Crypto),
            "bonds" => Ok(AssetCategory::Bonds),
            "commodities" => Ok(AssetCategory::Commodities),
            "energy" => Ok(AssetCategory::Energy),
            "cyclicals" => Ok(AssetCategory::Cyclicals),
            "defensive" => Ok(AssetCategory::Defensive),
            "real_assets" => Ok(AssetCategory::RealAssets),
            "value" => Ok(AssetCategory::Value),
            "core" => Ok(AssetCategory::Core),
            "high_beta" => Ok(AssetCategory::HighBeta),
            "defi" => Ok(AssetCategory::Defi),
            "other" => Ok(AssetCategory::Other),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// Quadrant → eligible symbols, plus symbol → category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationTable {
    pub quadrants: BTreeMap<Quadrant, Vec<String>>,
    pub categories: BTreeMap<String, AssetCategory>,
}

impl AllocationTable {
    /// The stock ETF universe per quadrant.
    pub fn standard() -> Self {
        use AssetCategory::*;

        let quads: [(Quadrant, &[&str]); 4] = [
            (Quadrant::Q1, &["QQQ", "ARKK", "IWM", "IBIT", "XLC", "XLY", "TLT", "LQD"]),
            (
                Quadrant::Q2,
                &["XLE", "DBC", "GCC", "XLF", "XLI", "XLB", "XOP", "VNQ", "VTV"],
            ),
            (
                Quadrant::Q3,
                &["FCG", "XLE", "XOP", "GLD", "DBC", "DBA", "TIP", "VNQ", "XLV", "XLU"],
            ),
            (Quadrant::Q4, &["VGLT", "IEF", "LQD", "MUB", "XLU", "XLP", "XLV"]),
        ];

        let cats: [(AssetCategory, &[&str]); 9] = [
            (Growth, &["QQQ", "ARKK", "IWM", "VUG", "XLC", "XLY"]),
            (Crypto, &["IBIT", "ETHA"]),
            (Bonds, &["TLT", "LQD", "IEF", "VGLT", "MUB", "TIP", "VTIP"]),
            (
                Commodities,
                &["XLE", "DBC", "GCC", "GLD", "DBA", "USO", "LIT", "AA", "PALL", "REMX", "URA"],
            ),
            (Energy, &["XOP", "FCG"]),
            (Cyclicals, &["XLF", "XLI", "XLB"]),
            (Defensive, &["XLU", "XLP", "XLV"]),
            (RealAssets, &["VNQ", "PAVE"]),
            (Value, &["VTV", "IWD"]),
        ];

        let mut table = AllocationTable::default();
        for (q, symbols) in quads {
            table = table.with_quadrant(q, symbols.iter().map(|s| s.to_string()).collect());
        }
        for (cat, symbols) in cats {
            for s in symbols {
                table = table.with_category(s, cat);
            }
        }
        table
    }

    pub fn with_quadrant(mut self, quadrant: Quadrant, symbols: Vec<String>) -> Self {
        self.quadrants.insert(quadrant, symbols);
        self
    }

    pub fn with_category(mut self, symbol: &str, category: AssetCategory) -> Self {
        self.categories.insert(symbol.to_string(), category);
        self
    }

    pub fn assets(&self, quadrant: Quadrant) -> &[String] {
        self.quadrants.get(&quadrant).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn category(&self, symbol: &str) -> AssetCategory {
        self.categories.get(symbol).copied().unwrap_or(AssetCategory::Other)
    }

    /// Every symbol named in any quadrant.
    pub fn symbols(&self) -> BTreeSet<String> {
        self.quadrants.values().flatten().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightingScheme {
    #[default]
    Momentum,
    Volatility,
}

impl FromStr for WeightingScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "momentum" => Ok(WeightingScheme::Momentum),
            "volatility" => Ok(WeightingScheme::Volatility),
            other => Err(format!("unknown weighting scheme '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Bullish,
    Neutral,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Conviction {
    High,
    Medium,
    Low,
}

/// Label thresholds shared by every caller that turns a weight into a label.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalThresholds {
    pub bullish: f64,
    pub conviction_high: f64,
    pub conviction_medium: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        SignalThresholds {
            bullish: 0.05,
            conviction_high: 0.15,
            conviction_medium: 0.08,
        }
    }
}

impl SignalThresholds {
    pub fn signal(&self, weight: f64) -> Signal {
        if weight >= self.bullish {
            Signal::Bullish
        } else if weight > 0.0 {
            Signal::Neutral
        } else {
            Signal::Bearish
        }
    }

    pub fn conviction(&self, weight: f64, total_leverage: f64) -> Conviction {
        if total_leverage <= 0.0 {
            return Conviction::Low;
        }
        let relative = weight / total_leverage;
        if relative >= self.conviction_high {
            Conviction::High
        } else if relative >= self.conviction_medium {
            Conviction::Medium
        } else {
            Conviction::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationConfig {
    pub max_positions: usize,
    pub leverage: f64,
    /// Share of the budget and slots given to the primary quadrant, in (0.5, 1].
    pub primary_ratio: f64,
    pub weighting: WeightingScheme,
    pub thresholds: SignalThresholds,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        AllocationConfig {
            max_positions: 10,
            leverage: 1.5,
            primary_ratio: 2.0 / 3.0,
            weighting: WeightingScheme::Momentum,
            thresholds: SignalThresholds::default(),
        }
    }
}

impl AllocationConfig {
    pub fn primary_budget(&self) -> f64 {
        self.leverage * self.primary_ratio
    }

    pub fn secondary_budget(&self) -> f64 {
        self.leverage * (1.0 - self.primary_ratio)
    }

    pub fn primary_slots(&self) -> usize {
        ((self.max_positions as f64 * self.primary_ratio).ceil() as usize).min(self.max_positions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetSignal {
    pub asset: String,
    pub signal: Signal,
    pub target_allocation: f64,
    pub conviction: Conviction,
    pub category: AssetCategory,
    pub quadrant: Quadrant,
}

/// Target weights for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub date: NaiveDate,
    pub weights: BTreeMap<String, f64>,
    pub signals: Vec<AssetSignal>,
    /// Σ weights. Not clamped to 1.0.
    pub total_leverage: f64,
    pub regime: RegimeState,
}

impl Allocation {
    pub fn position_count(&self) -> usize {
        self.weights.values().filter(|w| **w > 0.0).count()
    }

    pub fn weight(&self, symbol: &str) -> f64 {
        self.weights.get(symbol).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct AllocationEngine {
    pub table: AllocationTable,
    pub config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(table: AllocationTable, config: AllocationConfig) -> Self {
        AllocationEngine { table, config }
    }

    fn weighting_key(&self, score: &AssetScore) -> Option<f64> {
        match self.config.weighting {
            WeightingScheme::Momentum => score.momentum,
            WeightingScheme::Volatility => score.volatility,
        }
        .filter(|k| k.is_finite() && *k >= 0.0)
    }

    /// Eligible names of `quadrant`, strongest momentum first, ties alphabetical.
    fn ranked_candidates<'a>(
        &self,
        quadrant: Quadrant,
        scores: &'a BTreeMap<String, AssetScore>,
    ) -> Vec<(&'a str, f64, f64)> {
        let mut seen = BTreeSet::new();
        let mut out: Vec<(&'a str, f64, f64)> = self
            .table
            .assets(quadrant)
            .iter()
            .filter_map(|sym| {
                let (name, score) = scores.get_key_value(sym.as_str())?;
                if !score.eligible() || !seen.insert(name.as_str()) {
                    return None;
                }
                let momentum = score.momentum?;
                let key = self.weighting_key(score)?;
                Some((name.as_str(), momentum, key))
            })
            .collect();

        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        out
    }

    /// Spread `budget` over `picks` in proportion to their weighting key.
    fn distribute(budget: f64, picks: &[(&str, f64, f64)], weights: &mut BTreeMap<String, f64>) {
        if budget <= 0.0 || picks.is_empty() {
            return;
        }
        let total: f64 = picks.iter().map(|p| p.2).sum();
        for (sym, _, key) in picks {
            let w = if total > 0.0 {
                budget * key / total
            } else {
                budget / picks.len() as f64
            };
            if w > 0.0 {
                *weights.entry(sym.to_string()).or_insert(0.0) += w;
            }
        }
    }

    pub fn allocate(&self, regime: &RegimeState, scores: &BTreeMap<String, AssetScore>) -> Allocation {
        let max_positions = self.config.max_positions;

        let mut primary = self.ranked_candidates(regime.primary, scores);
        primary.truncate(self.config.primary_slots());

        let taken: BTreeSet<&str> = primary.iter().map(|p| p.0).collect();
        let mut free_slots = max_positions.saturating_sub(primary.len());
        let secondary: Vec<(&str, f64, f64)> = self
            .ranked_candidates(regime.secondary, scores)
            .into_iter()
            .filter(|c| {
                if taken.contains(c.0) {
                    true
                } else if free_slots > 0 {
                    free_slots -= 1;
                    true
                } else {
                    false
                }
            })
            .collect();

        let mut weights = BTreeMap::new();
        Self::distribute(self.config.primary_budget(), &primary, &mut weights);
        Self::distribute(self.config.secondary_budget(), &secondary, &mut weights);

        let total_leverage: f64 = weights.values().sum();
        if total_leverage > 1.0 {
            tracing::debug!(date = %regime.as_of, total_leverage, "gross exposure above 1.0");
        }

        let signals = self.build_signals(regime, &taken, &weights, total_leverage);

        Allocation {
            date: regime.as_of,
            weights,
            signals,
            total_leverage,
            regime: regime.clone(),
        }
    }

    fn build_signals(
        &self,
        regime: &RegimeState,
        primary_picks: &BTreeSet<&str>,
        weights: &BTreeMap<String, f64>,
        total_leverage: f64,
    ) -> Vec<AssetSignal> {
        let thresholds = &self.config.thresholds;
        let primary_universe: BTreeSet<&str> =
            self.table.assets(regime.primary).iter().map(String::as_str).collect();
        let universe: BTreeSet<&str> = primary_universe
            .iter()
            .copied()
            .chain(self.table.assets(regime.secondary).iter().map(String::as_str))
            .collect();

        let mut signals: Vec<AssetSignal> = universe
            .into_iter()
            .map(|sym| {
                let weight = weights.get(sym).copied().unwrap_or(0.0);
                // held names belong to the quadrant that picked them first
                let quadrant = if primary_picks.contains(sym) {
                    regime.primary
                } else if weight > 0.0 || !primary_universe.contains(sym) {
                    regime.secondary
                } else {
                    regime.primary
                };
                AssetSignal {
                    asset: sym.to_string(),
                    signal: thresholds.signal(weight),
                    target_allocation: weight,
                    conviction: thresholds.conviction(weight, total_leverage),
                    category: self.table.category(sym),
                    quadrant,
                }
            })
            .collect();

        signals.sort_by(|a, b| {
            b.target_allocation
                .partial_cmp(&a.target_allocation)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.asset.cmp(&b.asset))
        });
        signals
    }
}
