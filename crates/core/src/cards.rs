use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RankError {
    #[error("unrecognized rank: {0:?}")]
    Unrecognized(String),
    #[error("card value out of range: {0}")]
    ValueOutOfRange(i64),
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Numeric value used in formulas: A=1, numerals at face value, J=11, Q=12, K=13.
    pub fn value(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_value(value: i64) -> Result<Self, RankError> {
        if !(1..=13).contains(&value) {
            return Err(RankError::ValueOutOfRange(value));
        }
        Ok(Self::ALL[(value - 1) as usize])
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ace => "A",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
        }
    }

    /// Letter ranks that may appear directly inside a formula.
    pub fn from_letter(ch: char) -> Option<Self> {
        match ch.to_ascii_uppercase() {
            'A' => Some(Self::Ace),
            'J' => Some(Self::Jack),
            'Q' => Some(Self::Queen),
            'K' => Some(Self::King),
            _ => None,
        }
    }
}

impl FromStr for Rank {
    type Err = RankError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim().trim_matches(|c| c == '"' || c == '\'');
        let mut chars = trimmed.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if let Some(rank) = Self::from_letter(ch) {
                return Ok(rank);
            }
        }
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            let value: i64 = trimmed
                .parse()
                .map_err(|_| RankError::Unrecognized(input.to_string()))?;
            return Self::from_value(value);
        }
        Err(RankError::Unrecognized(input.to_string()))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn rank_to_value(rank: &str) -> Result<u8, RankError> {
    rank.parse::<Rank>().map(Rank::value)
}
