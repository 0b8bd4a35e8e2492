use game24_core::{Level, Puzzle, PuzzleError, Rank};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A card as written in corpus files: `"A"`, `"10"`, `"q"` or a bare number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CardToken {
    Number(i64),
    Text(String),
}

impl CardToken {
    pub fn to_rank(&self) -> Result<Rank, PuzzleError> {
        let rank = match self {
            Self::Number(value) => Rank::from_value(*value)?,
            Self::Text(text) => text.parse::<Rank>()?,
        };
        Ok(rank)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub cards: Option<Vec<CardToken>>,
    #[serde(default)]
    pub values: Option<Vec<i64>>,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub solutions: Vec<String>,
}

impl PuzzleRecord {
    pub fn into_puzzle(self) -> Result<Puzzle, PuzzleError> {
        let level = self.level.parse::<Level>().unwrap_or_else(|_| {
            warn!(id = ?self.id, label = %self.level, "unrecognized puzzle level");
            Level::Unrated
        });
        let values = self.values.filter(|values| !values.is_empty());
        match self.cards.filter(|cards| !cards.is_empty()) {
            Some(cards) => {
                let ranks = cards
                    .iter()
                    .map(CardToken::to_rank)
                    .collect::<Result<Vec<_>, _>>()?;
                Puzzle::from_cards(&ranks, values.as_deref(), level, self.solutions)
            }
            None => Puzzle::from_values(
                values.as_deref().unwrap_or_default(),
                level,
                self.solutions,
            ),
        }
    }
}

impl From<&Puzzle> for PuzzleRecord {
    fn from(puzzle: &Puzzle) -> Self {
        Self {
            id: None,
            cards: Some(
                puzzle
                    .cards
                    .iter()
                    .map(|rank| CardToken::Text(rank.label().to_string()))
                    .collect(),
            ),
            values: Some(puzzle.values.iter().map(|v| i64::from(*v)).collect()),
            level: puzzle.level.label().to_string(),
            solutions: puzzle.solutions.clone(),
        }
    }
}
