mod session;

use anyhow::Context;
use game24_core::{Difficulty, PuzzlePicker, RngState};
use game24_data::{load_corpus, load_game_config, DEFAULT_CONFIG_FILE, DEFAULT_PUZZLES_FILE};
use session::{RoundRecord, Session};
use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    puzzles: PathBuf,
    config: PathBuf,
    seed: Option<u64>,
    difficulty: Option<Difficulty>,
    report: Option<PathBuf>,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            puzzles: PathBuf::from(DEFAULT_PUZZLES_FILE),
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            seed: None,
            difficulty: None,
            report: None,
        }
    }
}

fn parse_cli_options(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        let value = || {
            args.get(idx + 1)
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match flag {
            "--puzzles" => {
                options.puzzles = PathBuf::from(value()?);
                idx += 1;
            }
            "--config" => {
                options.config = PathBuf::from(value()?);
                idx += 1;
            }
            "--seed" => {
                let raw = value()?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|_| format!("invalid seed: {raw}"))?;
                options.seed = Some(seed);
                idx += 1;
            }
            "--difficulty" | "-d" => {
                let raw = value()?;
                let difficulty = raw.parse::<Difficulty>().map_err(|err| err.to_string())?;
                options.difficulty = Some(difficulty);
                idx += 1;
            }
            "--report" => {
                options.report = Some(PathBuf::from(value()?));
                idx += 1;
            }
            other => return Err(format!("unknown option: {other}")),
        }
        idx += 1;
    }
    Ok(options)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_cli_options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            eprintln!(
                "usage: game24 [--puzzles FILE] [--config FILE] [--seed N] [--difficulty LEVEL] [--report FILE]"
            );
            std::process::exit(2);
        }
    };
    if let Err(err) = run(&options) {
        eprintln!("game24 error: {err:#}");
        std::process::exit(1);
    }
}

fn run(options: &CliOptions) -> anyhow::Result<()> {
    let mut config = load_game_config(&options.config)?;
    if options.seed.is_some() {
        config.picker.seed = options.seed;
    }
    let corpus = Arc::new(load_corpus(&options.puzzles)?);
    let mut picker = PuzzlePicker::new(corpus, config.picker.clone());
    info!(seed = picker.seed(), "picker ready");
    let help_rng = RngState::from_seed(picker.seed().wrapping_add(1));

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::new(stdin.lock(), stdout.lock(), config, help_rng);
    session.show_greeting()?;
    let difficulty = match options.difficulty {
        Some(difficulty) => difficulty,
        None => match session.choose_difficulty()? {
            Some(difficulty) => difficulty,
            None => return Ok(()),
        },
    };
    info!(%difficulty, "starting session");
    let records = session.run(&mut picker, difficulty)?;
    session.print_report(&records)?;
    if let Some(path) = &options.report {
        write_report(path, &records)?;
    }
    Ok(())
}

fn write_report(path: &Path, records: &[RoundRecord]) -> anyhow::Result<()> {
    let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), rounds = records.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_point_at_bundled_assets() {
        let options = parse_cli_options(&[]).expect("defaults");
        assert_eq!(options, CliOptions::default());
        assert_eq!(options.puzzles, PathBuf::from("assets/puzzles.json"));
    }

    #[test]
    fn reads_every_flag() {
        let options = parse_cli_options(&args(&[
            "--puzzles", "p.json", "--seed", "42", "-d", "3", "--report", "out.json",
        ]))
        .expect("parsed");
        assert_eq!(options.puzzles, PathBuf::from("p.json"));
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.difficulty, Some(Difficulty::Hard));
        assert_eq!(options.report, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_cli_options(&args(&["--seed"])).is_err());
        assert!(parse_cli_options(&args(&["--seed", "abc"])).is_err());
        assert!(parse_cli_options(&args(&["--difficulty", "extreme"])).is_err());
        assert!(parse_cli_options(&args(&["--verbose"])).is_err());
    }
}
