use crate::{Rank, RankError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const CARD_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Level {
    Easy,
    Medium,
    Hard,
    /// Label missing or not one of the three known levels.
    Unrated,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Unrated => "Unrated",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "" | "unrated" => Ok(Self::Unrated),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("expected 4 cards, got {0}")]
    CardCount(usize),
    #[error("expected 4 values, got {0}")]
    ValueCount(usize),
    #[error(transparent)]
    Rank(#[from] RankError),
    #[error("card {rank} has value {expected}, record says {found}")]
    CardValueMismatch { rank: Rank, expected: u8, found: i64 },
}

/// Sorted card values; two puzzles with equal keys deal the same numbers.
pub type MultisetKey = [u8; CARD_COUNT];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Puzzle {
    pub cards: [Rank; CARD_COUNT],
    pub values: [u8; CARD_COUNT],
    pub level: Level,
    pub solutions: Vec<String>,
}

impl Puzzle {
    pub fn new(cards: [Rank; CARD_COUNT], level: Level, solutions: Vec<String>) -> Self {
        Self {
            cards,
            values: cards.map(Rank::value),
            level,
            solutions,
        }
    }

    pub fn from_values(values: &[i64], level: Level, solutions: Vec<String>) -> Result<Self, PuzzleError> {
        let cards = ranks_from_values(values)?;
        Ok(Self::new(cards, level, solutions))
    }

    /// Builds a puzzle from card labels, checking them against explicit values when given.
    pub fn from_cards(
        cards: &[Rank],
        values: Option<&[i64]>,
        level: Level,
        solutions: Vec<String>,
    ) -> Result<Self, PuzzleError> {
        let cards: [Rank; CARD_COUNT] = cards
            .try_into()
            .map_err(|_| PuzzleError::CardCount(cards.len()))?;
        if let Some(values) = values {
            if values.len() != CARD_COUNT {
                return Err(PuzzleError::ValueCount(values.len()));
            }
            for (rank, found) in cards.iter().zip(values) {
                if i64::from(rank.value()) != *found {
                    return Err(PuzzleError::CardValueMismatch {
                        rank: *rank,
                        expected: rank.value(),
                        found: *found,
                    });
                }
            }
        }
        Ok(Self::new(cards, level, solutions))
    }

    pub fn has_solution(&self) -> bool {
        !self.solutions.is_empty()
    }

    pub fn multiset_key(&self) -> MultisetKey {
        multiset_key(&self.values)
    }

    pub fn ranks(&self) -> Vec<String> {
        self.cards.iter().map(|rank| rank.label().to_string()).collect()
    }

    /// `[A, 2, 2, 8] (values: 1, 2, 2, 8)`
    pub fn question(&self) -> String {
        let values: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        format!("[{}] (values: {})", self.ranks().join(", "), values.join(", "))
    }
}

pub fn multiset_key(values: &[u8; CARD_COUNT]) -> MultisetKey {
    let mut key = *values;
    key.sort_unstable();
    key
}

fn ranks_from_values(values: &[i64]) -> Result<[Rank; CARD_COUNT], PuzzleError> {
    if values.len() != CARD_COUNT {
        return Err(PuzzleError::ValueCount(values.len()));
    }
    let mut cards = [Rank::Ace; CARD_COUNT];
    for (slot, value) in cards.iter_mut().zip(values) {
        *slot = Rank::from_value(*value)?;
    }
    Ok(cards)
}

#[derive(Debug, Clone, Default)]
pub struct PuzzleCorpus {
    puzzles: Vec<Puzzle>,
}

impl PuzzleCorpus {
    pub fn new(puzzles: Vec<Puzzle>) -> Self {
        Self { puzzles }
    }

    pub fn puzzles(&self) -> &[Puzzle] {
        &self.puzzles
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Puzzle> {
        self.puzzles.get(index)
    }

    /// First puzzle dealing the same numbers, in any order.
    pub fn find_by_values(&self, values: &[i64]) -> Option<&Puzzle> {
        let mut wanted = values.to_vec();
        wanted.sort_unstable();
        self.puzzles.iter().find(|puzzle| {
            let key = puzzle.multiset_key();
            key.len() == wanted.len()
                && key.iter().zip(&wanted).all(|(a, b)| i64::from(*a) == *b)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_follow_cards() {
        let puzzle = Puzzle::new(
            [Rank::Ace, Rank::Ten, Rank::Queen, Rank::Five],
            Level::Easy,
            vec![],
        );
        assert_eq!(puzzle.values, [1, 10, 12, 5]);
        assert_eq!(puzzle.multiset_key(), [1, 5, 10, 12]);
        assert_eq!(puzzle.question(), "[A, 10, Q, 5] (values: 1, 10, 12, 5)");
    }

    #[test]
    fn disagreeing_values_are_rejected() {
        let err = Puzzle::from_cards(
            &[Rank::Ace, Rank::Two, Rank::Three, Rank::Jack],
            Some(&[1, 2, 3, 12]),
            Level::Hard,
            vec![],
        )
        .expect_err("jack is 11");
        assert_eq!(
            err,
            PuzzleError::CardValueMismatch {
                rank: Rank::Jack,
                expected: 11,
                found: 12
            }
        );
    }

    #[test]
    fn wrong_card_count_is_rejected() {
        let err = Puzzle::from_cards(&[Rank::Ace], None, Level::Easy, vec![]).expect_err("one card");
        assert_eq!(err, PuzzleError::CardCount(1));
        let err = Puzzle::from_values(&[1, 2, 3], Level::Easy, vec![]).expect_err("three values");
        assert_eq!(err, PuzzleError::ValueCount(3));
    }

    #[test]
    fn level_labels_are_case_insensitive() {
        assert_eq!("easy".parse::<Level>(), Ok(Level::Easy));
        assert_eq!(" MEDIUM ".parse::<Level>(), Ok(Level::Medium));
        assert_eq!("Hard".parse::<Level>(), Ok(Level::Hard));
        assert_eq!("".parse::<Level>(), Ok(Level::Unrated));
        assert!("Unknown".parse::<Level>().is_err());
    }

    #[test]
    fn corpus_lookup_ignores_order() {
        let corpus = PuzzleCorpus::new(vec![
            Puzzle::from_values(&[3, 3, 8, 8], Level::Hard, vec!["8/(3-8/3)".into()]).unwrap(),
            Puzzle::from_values(&[1, 1, 1, 1], Level::Unrated, vec![]).unwrap(),
        ]);
        let found = corpus.find_by_values(&[8, 3, 8, 3]).expect("present");
        assert!(found.has_solution());
        assert!(corpus.find_by_values(&[1, 1, 1]).is_none());
        assert!(corpus.find_by_values(&[2, 2, 2, 2]).is_none());
    }
}
