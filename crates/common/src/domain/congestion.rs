use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default free-flow baseline in km/h
pub const DEFAULT_FREE_FLOW_SPEED_KMH: f64 = 50.0;

/// Discrete congestion classification derived from a congestion score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CongestionLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl CongestionLevel {
    /// Map a score in [0, 1] onto half-open level bands
    pub fn from_score(score: f64) -> Self {
        if score < 0.25 {
            CongestionLevel::Green
        } else if score < 0.5 {
            CongestionLevel::Yellow
        } else if score < 0.75 {
            CongestionLevel::Orange
        } else {
            CongestionLevel::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionLevel::Green => "Green",
            CongestionLevel::Yellow => "Yellow",
            CongestionLevel::Orange => "Orange",
            CongestionLevel::Red => "Red",
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CongestionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Green" => Ok(CongestionLevel::Green),
            "Yellow" => Ok(CongestionLevel::Yellow),
            "Orange" => Ok(CongestionLevel::Orange),
            "Red" => Ok(CongestionLevel::Red),
            other => Err(format!("unknown congestion level: {}", other)),
        }
    }
}

/// Score and level computed together from one speed reading.
///
/// Only [`CongestionScorer`] can build one, so the two values never disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionAssessment {
    score: f64,
    level: CongestionLevel,
}

impl CongestionAssessment {
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn level(&self) -> CongestionLevel {
        self.level
    }
}

/// Pure mapping from average speed to congestion score and level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionScorer {
    free_flow_speed_kmh: f64,
}

impl Default for CongestionScorer {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_FLOW_SPEED_KMH)
    }
}

impl CongestionScorer {
    pub fn new(free_flow_speed_kmh: f64) -> Self {
        Self {
            free_flow_speed_kmh,
        }
    }

    pub fn free_flow_speed_kmh(&self) -> f64 {
        self.free_flow_speed_kmh
    }

    /// Score a speed reading.
    ///
    /// Negative speeds count as stopped traffic. A non-positive free-flow
    /// baseline yields a ratio of 0, so every reading scores 1.0.
    pub fn score(&self, avg_speed_kmh: f64) -> CongestionAssessment {
        let speed = avg_speed_kmh.max(0.0);

        let ratio = if self.free_flow_speed_kmh > 0.0 {
            (speed / self.free_flow_speed_kmh).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let score = 1.0 - ratio;

        CongestionAssessment {
            score,
            level: CongestionLevel::from_score(score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_flow_and_above_is_green() {
        let scorer = CongestionScorer::default();
        for speed in [50.0, 50.1, 80.0, 1_000.0] {
            let result = scorer.score(speed);
            assert_eq!(result.score(), 0.0);
            assert_eq!(result.level(), CongestionLevel::Green);
        }
    }

    #[test]
    fn test_zero_and_negative_speed_is_red() {
        let scorer = CongestionScorer::default();
        for speed in [0.0, -0.5, -30.0] {
            let result = scorer.score(speed);
            assert_eq!(result.score(), 1.0);
            assert_eq!(result.level(), CongestionLevel::Red);
        }
    }

    #[test]
    fn test_score_is_monotonically_non_increasing() {
        let scorer = CongestionScorer::default();
        let mut previous = scorer.score(-5.0).score();
        let mut speed = -5.0;
        while speed <= 70.0 {
            let current = scorer.score(speed).score();
            assert!(current <= previous, "score rose at speed {}", speed);
            previous = current;
            speed += 0.25;
        }
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(CongestionLevel::from_score(0.0), CongestionLevel::Green);
        assert_eq!(CongestionLevel::from_score(0.2499), CongestionLevel::Green);
        assert_eq!(CongestionLevel::from_score(0.25), CongestionLevel::Yellow);
        assert_eq!(CongestionLevel::from_score(0.4999), CongestionLevel::Yellow);
        assert_eq!(CongestionLevel::from_score(0.5), CongestionLevel::Orange);
        assert_eq!(CongestionLevel::from_score(0.75), CongestionLevel::Red);
        assert_eq!(CongestionLevel::from_score(1.0), CongestionLevel::Red);
    }

    #[test]
    fn test_exact_speed_boundaries() {
        // 37.5 km/h -> ratio 0.75 -> score 0.25
        let scorer = CongestionScorer::default();
        assert_eq!(scorer.score(37.5).level(), CongestionLevel::Yellow);
        assert_eq!(scorer.score(25.0).level(), CongestionLevel::Orange);
        assert_eq!(scorer.score(12.5).level(), CongestionLevel::Red);
    }

    #[test]
    fn test_zero_free_flow_does_not_divide() {
        let scorer = CongestionScorer::new(0.0);
        let result = scorer.score(42.0);
        assert_eq!(result.score(), 1.0);
        assert_eq!(result.level(), CongestionLevel::Red);
    }

    #[test]
    fn test_level_string_round_trip() {
        for level in [
            CongestionLevel::Green,
            CongestionLevel::Yellow,
            CongestionLevel::Orange,
            CongestionLevel::Red,
        ] {
            assert_eq!(level.as_str().parse::<CongestionLevel>().unwrap(), level);
        }
        assert!("Purple".parse::<CongestionLevel>().is_err());
    }
}
