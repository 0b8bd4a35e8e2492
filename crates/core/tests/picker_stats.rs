use game24_core::{
    Difficulty, Level, PickerConfig, Puzzle, PuzzleCorpus, PuzzlePicker, SharedPicker,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Distinct value-multisets in a stable order.
fn multisets(count: usize) -> Vec<[i64; 4]> {
    let mut out = Vec::new();
    for a in 1..=13 {
        for b in a..=13 {
            for c in b..=13 {
                for d in c..=13 {
                    if out.len() == count {
                        return out;
                    }
                    out.push([a, b, c, d]);
                }
            }
        }
    }
    out
}

fn corpus_with(levels: &[(Level, bool, usize)]) -> Arc<PuzzleCorpus> {
    let total = levels.iter().map(|(_, _, count)| count).sum();
    let mut values = multisets(total).into_iter();
    let mut puzzles = Vec::new();
    for (level, solvable, count) in levels {
        for _ in 0..*count {
            let solutions = if *solvable {
                vec!["stub".to_string()]
            } else {
                Vec::new()
            };
            let next = values.next().expect("enough multisets");
            puzzles.push(Puzzle::from_values(&next, *level, solutions).expect("valid"));
        }
    }
    Arc::new(PuzzleCorpus::new(puzzles))
}

fn seeded(corpus: Arc<PuzzleCorpus>, window: usize, seed: u64) -> PuzzlePicker {
    let config = PickerConfig {
        recent_window: window,
        seed: Some(seed),
        ..PickerConfig::default()
    };
    PuzzlePicker::new(corpus, config)
}

#[test]
fn no_repeats_inside_the_window() {
    let corpus = corpus_with(&[(Level::Easy, true, 100)]);
    let mut picker = seeded(corpus, 60, 11);
    let served: Vec<_> = (0..300)
        .map(|_| picker.pick(Difficulty::Easy).expect("pool").multiset_key())
        .collect();
    for window in served.windows(60) {
        let distinct: HashSet<_> = window.iter().collect();
        assert_eq!(distinct.len(), 60);
    }
}

#[test]
fn small_pool_keeps_serving() {
    let corpus = corpus_with(&[(Level::Hard, true, 3)]);
    let mut picker = seeded(corpus, 60, 3);
    let served: Vec<_> = (0..30)
        .map(|_| picker.pick(Difficulty::Hard).expect("relaxed").multiset_key())
        .collect();
    let distinct: HashSet<_> = served.iter().collect();
    assert_eq!(distinct.len(), 3);
}

#[test]
fn medium_unsolvable_share_converges_to_target() {
    let corpus = corpus_with(&[
        (Level::Medium, true, 80),
        (Level::Unrated, false, 40),
        (Level::Easy, true, 20),
    ]);
    for seed in [1, 2, 3] {
        let mut picker = seeded(Arc::clone(&corpus), 60, seed);
        let mut unsolvable = 0usize;
        let picks = 2000;
        for _ in 0..picks {
            let puzzle = picker.pick(Difficulty::Medium).expect("pool");
            assert!(puzzle.level == Level::Medium || !puzzle.has_solution());
            if !puzzle.has_solution() {
                unsolvable += 1;
            }
        }
        let share = unsolvable as f64 / picks as f64;
        assert!((share - 0.10).abs() < 0.02, "seed {seed}: share {share}");
        let stats = picker.medium_stats();
        assert_eq!(stats.served_total, picks as u64);
        assert_eq!(stats.served_no_solution, unsolvable as u64);
    }
}

#[test]
fn custom_target_is_honored() {
    let corpus = corpus_with(&[(Level::Medium, true, 80), (Level::Unrated, false, 80)]);
    let config = PickerConfig {
        recent_window: 20,
        medium_no_solution_target: 0.30,
        seed: Some(5),
        ..PickerConfig::default()
    };
    let mut picker = PuzzlePicker::new(corpus, config);
    for _ in 0..2000 {
        picker.pick(Difficulty::Medium).expect("pool");
    }
    let ratio = picker.medium_stats().ratio();
    assert!((ratio - 0.30).abs() < 0.03, "ratio {ratio}");
}

#[test]
fn only_unsolvable_medium_pool_never_fails() {
    let corpus = corpus_with(&[(Level::Unrated, false, 5), (Level::Easy, true, 5)]);
    let mut picker = seeded(corpus, 60, 9);
    for _ in 0..20 {
        let puzzle = picker.pick(Difficulty::Medium).expect("unsolvable pool");
        assert!(!puzzle.has_solution());
    }
    assert_eq!(picker.medium_stats().ratio(), 1.0);
}

#[test]
fn same_seed_serves_same_sequence() {
    let corpus = corpus_with(&[(Level::Easy, true, 30), (Level::Unrated, false, 10)]);
    let mut first = seeded(Arc::clone(&corpus), 10, 42);
    let mut second = seeded(corpus, 10, 42);
    for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
        .into_iter()
        .cycle()
        .take(60)
    {
        assert_eq!(
            first.pick(difficulty).map(Puzzle::multiset_key),
            second.pick(difficulty).map(Puzzle::multiset_key)
        );
    }
}

#[test]
fn shared_picker_reset_clears_history() {
    let corpus = corpus_with(&[(Level::Medium, true, 10), (Level::Unrated, false, 2)]);
    let shared = SharedPicker::new(seeded(corpus, 60, 4));
    for _ in 0..5 {
        shared.pick(Difficulty::Medium).expect("pool");
    }
    assert_eq!(shared.medium_stats().served_total, 5);
    shared.reset();
    assert_eq!(shared.medium_stats().served_total, 0);
    assert_eq!(shared.serve("medium").map(|served| served.seq), Ok(1));
    assert!(shared.serve("extreme").is_err());
}
