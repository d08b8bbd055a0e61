//! End-of-round summary

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::models::RoundState;

/// Score band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    /// 0-4 correct
    Rookie,
    /// 5-9 correct
    Regular,
    /// 10 and up
    Legend,
}

impl Rank {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=4 => Rank::Rookie,
            5..=9 => Rank::Regular,
            _ => Rank::Legend,
        }
    }
}

/// Read-only snapshot taken when a round finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub score: u32,
    pub passed: u32,
    pub date: DateTime<Local>,
}

impl GameResult {
    pub fn from_round(round: &RoundState) -> Self {
        Self {
            score: round.score,
            passed: round.passed,
            date: Local::now(),
        }
    }

    /// Cards attempted
    pub fn total(&self) -> u32 {
        self.score + self.passed
    }

    /// Share of attempted cards guessed, 0.0 when nothing was attempted
    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => f64::from(self.score) / f64::from(total),
        }
    }

    pub fn rank(&self) -> Rank {
        Rank::from_score(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: u32, passed: u32) -> GameResult {
        GameResult {
            score,
            passed,
            date: Local::now(),
        }
    }

    #[test]
    fn rank_bands() {
        assert_eq!(Rank::from_score(0), Rank::Rookie);
        assert_eq!(Rank::from_score(4), Rank::Rookie);
        assert_eq!(Rank::from_score(5), Rank::Regular);
        assert_eq!(Rank::from_score(9), Rank::Regular);
        assert_eq!(Rank::from_score(10), Rank::Legend);
        assert_eq!(Rank::from_score(250), Rank::Legend);
    }

    #[test]
    fn empty_result_has_zero_accuracy() {
        let result = result(0, 0);

        assert_eq!(result.total(), 0);
        assert_eq!(result.accuracy(), 0.0);
        assert_eq!(result.rank(), Rank::Rookie);
    }

    #[test]
    fn accuracy_is_score_over_total() {
        let result = result(6, 2);

        assert_eq!(result.total(), 8);
        assert_eq!(result.accuracy(), 0.75);
        assert_eq!(result.rank(), Rank::Regular);
    }

    #[test]
    fn all_passed_is_zero_accuracy() {
        assert_eq!(result(0, 5).accuracy(), 0.0);
    }
}
