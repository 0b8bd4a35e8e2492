use game24_core::{
    evaluate_and_validate, Difficulty, GameConfig, PickerConfig, PuzzlePicker, Rank,
};
use game24_data::{load_corpus, load_game_config, PuzzleRecord};
use std::path::PathBuf;
use std::sync::Arc;

fn assets_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("assets")
}

#[test]
fn bundled_corpus_loads() {
    let corpus = load_corpus(&assets_root().join("puzzles.json")).expect("load corpus");
    assert!(corpus.len() > 100);
    assert!(corpus.puzzles().iter().any(|p| !p.has_solution()));
    for puzzle in corpus.puzzles() {
        let derived: Vec<u8> = puzzle.cards.iter().map(|rank| rank.value()).collect();
        assert_eq!(derived, puzzle.values.to_vec());
    }
}

#[test]
fn every_listed_solution_is_accepted() {
    let corpus = load_corpus(&assets_root().join("puzzles.json")).expect("load corpus");
    let config = GameConfig::default();
    for puzzle in corpus.puzzles() {
        let required: Vec<i64> = puzzle.values.iter().map(|v| i64::from(*v)).collect();
        for solution in &puzzle.solutions {
            let value = evaluate_and_validate(solution, &required)
                .unwrap_or_else(|err| panic!("{solution} for {:?}: {err}", puzzle.values));
            assert!(config.hits_target(value), "{solution} gave {value}");
        }
    }
}

#[test]
fn classic_puzzles_are_present() {
    let corpus = load_corpus(&assets_root().join("puzzles.json")).expect("load corpus");
    let sixes = corpus.find_by_values(&[6, 6, 6, 6]).expect("6 6 6 6");
    assert!(sixes.has_solution());
    let ones = corpus.find_by_values(&[1, 1, 1, 1]).expect("1 1 1 1");
    assert!(!ones.has_solution());
    let eights = corpus.find_by_values(&[8, 3, 8, 3]).expect("3 3 8 8");
    assert_eq!(eights.cards[0], Rank::Three);
}

#[test]
fn bundled_config_matches_defaults_where_unset() {
    let config = load_game_config(&assets_root().join("game24.json")).expect("load config");
    assert_eq!(config.target, 24.0);
    assert_eq!(config.picker.recent_window, 60);
    assert!((config.picker.medium_no_solution_target - 0.10).abs() < 1e-12);
    assert_eq!(config.limits.max_input_len, 200);
}

#[test]
fn every_difficulty_is_servable_from_the_bundled_corpus() {
    let corpus = Arc::new(load_corpus(&assets_root().join("puzzles.json")).expect("load corpus"));
    let config = PickerConfig {
        seed: Some(24),
        ..PickerConfig::default()
    };
    let mut picker = PuzzlePicker::new(corpus, config);
    for difficulty in Difficulty::ALL {
        for _ in 0..100 {
            let puzzle = picker.pick(difficulty).expect("eligible puzzle");
            assert!(difficulty.admits(puzzle));
        }
    }
}

#[test]
fn records_round_trip_through_puzzles() {
    let corpus = load_corpus(&assets_root().join("puzzles.json")).expect("load corpus");
    let puzzle = corpus.get(0).expect("first puzzle");
    let record = PuzzleRecord::from(puzzle);
    assert_eq!(&record.into_puzzle().expect("valid record"), puzzle);
}
