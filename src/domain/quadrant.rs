//! Growth/inflation quadrants and per-date quadrant scores.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Quadrant {
    /// Growth rising, inflation falling.
    Q1,
    /// Growth rising, inflation rising.
    Q2,
    /// Growth falling, inflation rising.
    Q3,
    /// Growth falling, inflation falling.
    Q4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rising,
    Falling,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::Q1, Quadrant::Q2, Quadrant::Q3, Quadrant::Q4];

    pub fn growth(self) -> Direction {
        match self {
            Quadrant::Q1 | Quadrant::Q2 => Direction::Rising,
            Quadrant::Q3 | Quadrant::Q4 => Direction::Falling,
        }
    }

    pub fn inflation(self) -> Direction {
        match self {
            Quadrant::Q2 | Quadrant::Q3 => Direction::Rising,
            Quadrant::Q1 | Quadrant::Q4 => Direction::Falling,
        }
    }

    pub fn from_directions(growth: Direction, inflation: Direction) -> Self {
        match (growth, inflation) {
            (Direction::Rising, Direction::Falling) => Quadrant::Q1,
            (Direction::Rising, Direction::Rising) => Quadrant::Q2,
            (Direction::Falling, Direction::Rising) => Quadrant::Q3,
            (Direction::Falling, Direction::Falling) => Quadrant::Q4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quadrant::Q1 => "Q1",
            Quadrant::Q2 => "Q2",
            Quadrant::Q3 => "Q3",
            Quadrant::Q4 => "Q4",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quadrant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(Quadrant::Q1),
            "Q2" => Ok(Quadrant::Q2),
            "Q3" => Ok(Quadrant::Q3),
            "Q4" => Ok(Quadrant::Q4),
            other => Err(format!("unknown quadrant '{}'", other)),
        }
    }
}

impl Direction {
    /// Rising only for a strictly positive divergence; flat counts as falling.
    pub fn of(divergence: f64) -> Self {
        if divergence > 0.0 {
            Direction::Rising
        } else {
            Direction::Falling
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rising => f.write_str("rising"),
            Direction::Falling => f.write_str("falling"),
        }
    }
}

/// Scores for all four quadrants on one date.
///
/// Each score is the sum of the growth and inflation divergences signed by
/// the quadrant's defining directions. The primary quadrant is the one whose
/// directions match the divergence signs; a flat axis is falling, which also
/// settles the tie a zero divergence leaves between two quadrants.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadrantScore {
    pub date: NaiveDate,
    pub growth: f64,
    pub inflation: f64,
    pub scores: [f64; 4],
}

impl QuadrantScore {
    pub fn from_divergence(date: NaiveDate, growth: f64, inflation: f64) -> Self {
        QuadrantScore {
            date,
            growth,
            inflation,
            scores: [
                growth - inflation,
                growth + inflation,
                -growth + inflation,
                -growth - inflation,
            ],
        }
    }

    pub fn score(&self, quadrant: Quadrant) -> f64 {
        self.scores[quadrant.index()]
    }

    pub fn growth_direction(&self) -> Direction {
        Direction::of(self.growth)
    }

    pub fn inflation_direction(&self) -> Direction {
        Direction::of(self.inflation)
    }

    /// The direction-matched quadrant first, then the rest by descending
    /// score with ties in Q1..Q4 order.
    pub fn ranking(&self) -> [Quadrant; 4] {
        let primary = Quadrant::from_directions(self.growth_direction(), self.inflation_direction());
        let mut ranked = Quadrant::ALL;
        ranked.sort_by(|a, b| {
            (*b == primary).cmp(&(*a == primary)).then_with(|| {
                self.score(*b)
                    .partial_cmp(&self.score(*a))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        ranked
    }

    pub fn primary(&self) -> Quadrant {
        self.ranking()[0]
    }

    pub fn secondary(&self) -> Quadrant {
        self.ranking()[1]
    }

    /// Score gap between the top two quadrants.
    pub fn gap(&self) -> f64 {
        let ranked = self.ranking();
        self.score(ranked[0]) - self.score(ranked[1])
    }
}
