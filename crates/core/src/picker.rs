//! Puzzle selection by difficulty with repeat avoidance and ratio steering.

use crate::{Level, MultisetKey, PickerConfig, Puzzle, PuzzleCorpus, RngState};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Eligibility predicate for this bucket. Unsolvable puzzles qualify everywhere.
    pub fn admits(self, puzzle: &Puzzle) -> bool {
        if !puzzle.has_solution() {
            return true;
        }
        match self {
            Self::Easy => matches!(puzzle.level, Level::Easy | Level::Medium),
            Self::Medium => puzzle.level == Level::Medium,
            Self::Hard => {
                puzzle.level == Level::Hard
                    || !puzzle.values.iter().any(|value| *value == 1 || *value == 2)
            }
        }
    }
}

impl FromStr for Difficulty {
    type Err = PickError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "easy" | "1" => Ok(Self::Easy),
            "medium" | "2" => Ok(Self::Medium),
            "hard" | "3" => Ok(Self::Hard),
            _ => Err(PickError::UnknownDifficulty(input.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PickError {
    #[error("unknown difficulty {0:?} (use easy/1, medium/2, hard/3)")]
    UnknownDifficulty(String),
    #[error("no more puzzles available for {0} difficulty")]
    NoEligiblePuzzle(Difficulty),
}

/// The last `window` value-multisets served, oldest first.
#[derive(Debug, Clone)]
pub struct SelectionHistory {
    window: usize,
    recent: VecDeque<MultisetKey>,
}

impl SelectionHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            recent: VecDeque::with_capacity(window),
        }
    }

    pub fn contains(&self, key: &MultisetKey) -> bool {
        self.recent.contains(key)
    }

    pub fn record(&mut self, key: MultisetKey) {
        if self.window == 0 {
            return;
        }
        while self.recent.len() >= self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(key);
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatioTracker {
    pub served_total: u64,
    pub served_no_solution: u64,
}

impl RatioTracker {
    pub fn ratio(&self) -> f64 {
        if self.served_total == 0 {
            return 0.0;
        }
        self.served_no_solution as f64 / self.served_total as f64
    }

    pub fn record(&mut self, puzzle: &Puzzle) {
        self.served_total += 1;
        if !puzzle.has_solution() {
            self.served_no_solution += 1;
        }
    }
}

/// Subset a medium pick was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Steering {
    /// Not a medium pick.
    Off,
    /// One subset was empty, so all candidates stayed in play.
    Mixed,
    Unsolvable,
    Solvable,
}

/// Single-owner selection state. Wrap it in [`SharedPicker`] to serve
/// concurrent callers.
#[derive(Debug)]
pub struct PuzzlePicker {
    corpus: Arc<PuzzleCorpus>,
    config: PickerConfig,
    history: SelectionHistory,
    medium: RatioTracker,
    served: u64,
    rng: RngState,
}

impl PuzzlePicker {
    pub fn new(corpus: Arc<PuzzleCorpus>, config: PickerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => RngState::from_seed(seed),
            None => RngState::from_entropy(),
        };
        Self {
            history: SelectionHistory::new(config.recent_window),
            corpus,
            config,
            medium: RatioTracker::default(),
            served: 0,
            rng,
        }
    }

    pub fn corpus(&self) -> &Arc<PuzzleCorpus> {
        &self.corpus
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    pub fn medium_stats(&self) -> RatioTracker {
        self.medium
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Puzzles served since construction or the last reset.
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Forgets served history and counters; the RNG stream continues.
    pub fn reset(&mut self) {
        self.history.clear();
        self.medium = RatioTracker::default();
        self.served = 0;
    }

    pub fn pick_token(&mut self, token: &str) -> Result<&Puzzle, PickError> {
        let difficulty: Difficulty = token.parse()?;
        self.pick(difficulty)
            .ok_or(PickError::NoEligiblePuzzle(difficulty))
    }

    /// Serves one puzzle, or `None` once nothing in the corpus qualifies.
    pub fn pick(&mut self, difficulty: Difficulty) -> Option<&Puzzle> {
        let corpus = Arc::clone(&self.corpus);
        let eligible: Vec<usize> = corpus
            .puzzles()
            .iter()
            .enumerate()
            .filter(|(_, puzzle)| difficulty.admits(puzzle))
            .map(|(idx, _)| idx)
            .collect();
        if eligible.is_empty() {
            debug!(%difficulty, "no eligible puzzle");
            return None;
        }

        let fresh: Vec<usize> = eligible
            .iter()
            .copied()
            .filter(|idx| !self.history.contains(&corpus.puzzles()[*idx].multiset_key()))
            .collect();
        let relaxed = fresh.is_empty();
        let candidates = if relaxed { eligible } else { fresh };

        let (pool, steering) = if difficulty == Difficulty::Medium {
            self.steer(&corpus, candidates)
        } else {
            (candidates, Steering::Off)
        };

        let index = *self.rng.choose(&pool)?;
        let puzzle = &corpus.puzzles()[index];
        self.history.record(puzzle.multiset_key());
        self.served += 1;
        if difficulty == Difficulty::Medium {
            self.medium.record(puzzle);
        }
        debug!(
            seq = self.served,
            %difficulty,
            values = ?puzzle.values,
            has_solution = puzzle.has_solution(),
            relaxed,
            ?steering,
            "served puzzle"
        );
        self.corpus.get(index)
    }

    /// Probability of drawing from the unsolvable subset at medium difficulty:
    /// `clamp(target + gain * (target - ratio), 0, 1)`. It equals `target`
    /// exactly when the served ratio is on target, so the ratio settles there.
    pub fn no_solution_bias(&self) -> f64 {
        let target = self.config.medium_no_solution_target;
        let ratio = self.medium.ratio();
        (target + self.config.steering_gain * (target - ratio)).clamp(0.0, 1.0)
    }

    fn steer(
        &mut self,
        corpus: &PuzzleCorpus,
        candidates: Vec<usize>,
    ) -> (Vec<usize>, Steering) {
        let (unsolvable, solvable): (Vec<usize>, Vec<usize>) = candidates
            .iter()
            .copied()
            .partition(|idx| !corpus.puzzles()[*idx].has_solution());
        if unsolvable.is_empty() || solvable.is_empty() {
            return (candidates, Steering::Mixed);
        }
        let bias = self.no_solution_bias();
        let drew_unsolvable = self.rng.chance(bias);
        debug!(
            bias,
            ratio = self.medium.ratio(),
            drew_unsolvable,
            "medium steering"
        );
        if drew_unsolvable {
            (unsolvable, Steering::Unsolvable)
        } else {
            (solvable, Steering::Solvable)
        }
    }
}

/// A puzzle numbered from 1 since the last reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub seq: u64,
    pub puzzle: Puzzle,
}

/// A [`PuzzlePicker`] behind one lock so each pick's read-modify-write of
/// history and counters is serialized.
#[derive(Debug)]
pub struct SharedPicker {
    inner: Mutex<PuzzlePicker>,
}

impl SharedPicker {
    pub fn new(picker: PuzzlePicker) -> Self {
        Self {
            inner: Mutex::new(picker),
        }
    }

    // Every mutation completes before the guard drops, so a poisoned lock
    // still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, PuzzlePicker> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pick(&self, difficulty: Difficulty) -> Option<Puzzle> {
        self.lock().pick(difficulty).cloned()
    }

    /// Picks and numbers a puzzle under one lock, so a concurrent
    /// [`SharedPicker::reset`] never splits the two.
    pub fn serve(&self, token: &str) -> Result<Served, PickError> {
        let mut picker = self.lock();
        let puzzle = picker.pick_token(token)?.clone();
        Ok(Served {
            seq: picker.served(),
            puzzle,
        })
    }

    pub fn served(&self) -> u64 {
        self.lock().served()
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn medium_stats(&self) -> RatioTracker {
        self.lock().medium_stats()
    }
}
