use crate::schema::PuzzleRecord;
use anyhow::{bail, Context};
use game24_core::{GameConfig, PuzzleCorpus};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_PUZZLES_FILE: &str = "assets/puzzles.json";
pub const DEFAULT_CONFIG_FILE: &str = "assets/game24.json";

pub fn load_corpus(path: &Path) -> anyhow::Result<PuzzleCorpus> {
    let records: Vec<PuzzleRecord> = load_json(path)?;
    let corpus = corpus_from_records(records).with_context(|| format!("load {}", path.display()))?;
    info!(path = %path.display(), puzzles = corpus.len(), "loaded puzzle corpus");
    Ok(corpus)
}

pub fn parse_corpus(raw: &str) -> anyhow::Result<PuzzleCorpus> {
    let records: Vec<PuzzleRecord> = serde_json::from_str(raw).context("parse puzzle corpus")?;
    corpus_from_records(records)
}

pub fn corpus_from_records(records: Vec<PuzzleRecord>) -> anyhow::Result<PuzzleCorpus> {
    let mut puzzles = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let label = match record.id {
            Some(id) => format!("puzzle #{index} (id {id})"),
            None => format!("puzzle #{index}"),
        };
        let puzzle = record.into_puzzle().with_context(|| label)?;
        puzzles.push(puzzle);
    }
    if puzzles.is_empty() {
        bail!("puzzle corpus is empty");
    }
    Ok(PuzzleCorpus::new(puzzles))
}

/// Reads the game config; a missing file means defaults.
pub fn load_game_config(path: &Path) -> anyhow::Result<GameConfig> {
    if !path.exists() {
        return Ok(GameConfig::default());
    }
    let config: GameConfig = load_json(path)?;
    validate_config(&config).with_context(|| format!("validate {}", path.display()))?;
    Ok(config)
}

fn validate_config(config: &GameConfig) -> anyhow::Result<()> {
    let target = config.picker.medium_no_solution_target;
    if !(0.0..=1.0).contains(&target) {
        bail!("medium_no_solution_target must be within [0, 1], got {target}");
    }
    if config.picker.steering_gain < 0.0 {
        bail!("steering_gain must not be negative");
    }
    if config.tolerance <= 0.0 {
        bail!("tolerance must be positive");
    }
    if config.limits.max_exponent <= 0.0 {
        bail!("max_exponent must be positive");
    }
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let data = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(data)
}
