use game24_core::{
    judge_answer, CheckError, Difficulty, GameConfig, Puzzle, PuzzlePicker, RngState, Verdict,
};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

pub const GREETING: &str = "24point - game: use 4 numbers to formula to 24 points";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundCommand {
    Time,
    Help,
    HelpAll,
    Skip,
    Stop,
    Answer(String),
}

impl RoundCommand {
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        let command = match trimmed.to_lowercase().as_str() {
            "time" => Self::Time,
            "help" => Self::Help,
            "help all" => Self::HelpAll,
            "skip" => Self::Skip,
            "stop" => Self::Stop,
            _ => Self::Answer(trimmed.to_string()),
        };
        Some(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolvedVia {
    Formula,
    NoSolution,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub seqno: usize,
    pub question: String,
    pub solved: bool,
    pub time_sec: f64,
    pub attempts: u32,
    pub used_help: bool,
    pub solved_via: Option<SolvedVia>,
    #[serde(skip)]
    pub stopped: bool,
}

pub struct Session<R, W> {
    input: R,
    output: W,
    config: GameConfig,
    rng: RngState,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(input: R, output: W, config: GameConfig, rng: RngState) -> Self {
        Self {
            input,
            output,
            config,
            rng,
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn show_greeting(&mut self) -> io::Result<()> {
        let rule = "=".repeat(GREETING.chars().count());
        writeln!(self.output, "{rule}\n{GREETING}\n{rule}")?;
        writeln!(self.output, "Type a math expression using + - * / ** and parentheses.")?;
        writeln!(self.output, "Ranks allowed directly in formulas: A, J, Q, K (case-insensitive).")?;
        writeln!(
            self.output,
            "Commands: 'help' (one), 'help all' (all), 'skip' (next), 'time' (elapsed), 'stop' (quit)."
        )?;
        writeln!(self.output, "No-solution answers: 'no sol', '0', or '-1'.")?;
        writeln!(self.output, "Rule: Your formula must use exactly the four card values shown.\n")
    }

    pub fn choose_difficulty(&mut self) -> io::Result<Option<Difficulty>> {
        loop {
            let Some(line) = self.read_line("Choose difficulty (easy/1, medium/2, hard/3): ")? else {
                return Ok(None);
            };
            match line.parse::<Difficulty>() {
                Ok(difficulty) => return Ok(Some(difficulty)),
                Err(_) => writeln!(self.output, "Please enter: easy or 1, medium or 2, hard or 3.")?,
            }
        }
    }

    /// Serves puzzles until the pool runs dry or the player stops.
    pub fn run(&mut self, picker: &mut PuzzlePicker, difficulty: Difficulty) -> io::Result<Vec<RoundRecord>> {
        writeln!(self.output, "\nStarting...")?;
        let mut records = Vec::new();
        loop {
            let Some(puzzle) = picker.pick(difficulty).cloned() else {
                writeln!(
                    self.output,
                    "\nNo more puzzles available for this difficulty (given constraints)."
                )?;
                break;
            };
            let record = self.play_round(&puzzle, records.len() + 1)?;
            let stopped = record.stopped;
            records.push(record);
            if stopped {
                break;
            }
        }
        Ok(records)
    }

    pub fn play_round(&mut self, puzzle: &Puzzle, seqno: usize) -> io::Result<RoundRecord> {
        writeln!(self.output, "\nQ{seqno}: Cards: {}", puzzle.question())?;
        let values: Vec<i64> = puzzle.values.iter().map(|v| i64::from(*v)).collect();
        let start = Instant::now();
        let mut record = RoundRecord {
            seqno,
            question: format!("[{}]", puzzle.ranks().join(", ")),
            solved: false,
            time_sec: 0.0,
            attempts: 0,
            used_help: false,
            solved_via: None,
            stopped: false,
        };

        loop {
            let line = self.read_line("Your answer (or 'help'/'help all'/'skip'/'time'/'stop'): ")?;
            let elapsed = start.elapsed();
            record.time_sec = elapsed.as_secs_f64();
            let Some(line) = line else {
                record.stopped = true;
                return Ok(record);
            };
            let Some(command) = RoundCommand::parse(&line) else {
                continue;
            };
            match command {
                RoundCommand::Time => {
                    writeln!(self.output, "Elapsed: {}", format_secs(elapsed))?;
                }
                RoundCommand::Stop => {
                    writeln!(self.output, "Stopping...")?;
                    record.stopped = true;
                    return Ok(record);
                }
                RoundCommand::Skip => {
                    writeln!(self.output, "Skipped after {}.", format_secs(elapsed))?;
                    return Ok(record);
                }
                RoundCommand::Help | RoundCommand::HelpAll => {
                    record.used_help = true;
                    self.show_help(puzzle, command == RoundCommand::HelpAll)?;
                    return Ok(record);
                }
                RoundCommand::Answer(answer) => {
                    record.attempts += 1;
                    let verdict = judge_answer(&values, &puzzle.solutions, &answer, &self.config);
                    if self.report_verdict(&verdict, elapsed)? {
                        record.solved = true;
                        record.solved_via = Some(match verdict {
                            Verdict::NoSolution => SolvedVia::NoSolution,
                            _ => SolvedVia::Formula,
                        });
                        return Ok(record);
                    }
                }
            }
        }
    }

    fn show_help(&mut self, puzzle: &Puzzle, all: bool) -> io::Result<()> {
        if !puzzle.has_solution() {
            return writeln!(self.output, "No solution.");
        }
        let total = puzzle.solutions.len();
        if all {
            writeln!(self.output, "All {total} solution(s):")?;
            for (idx, solution) in puzzle.solutions.iter().enumerate() {
                writeln!(self.output, "  {}. {solution}", idx + 1)?;
            }
            return Ok(());
        }
        if let Some(solution) = self.rng.choose(&puzzle.solutions) {
            writeln!(self.output, "Solution (1/{total}): {solution}")?;
        }
        Ok(())
    }

    /// Prints feedback; returns whether the round is won.
    fn report_verdict(&mut self, verdict: &Verdict, elapsed: Duration) -> io::Result<bool> {
        let time = format_secs(elapsed);
        match verdict {
            Verdict::Solved { .. } => {
                writeln!(self.output, "Correct! ({time})")?;
            }
            Verdict::NoSolution => {
                writeln!(self.output, "Correct: this puzzle has no solution. ({time})")?;
            }
            Verdict::SolutionExists => {
                writeln!(
                    self.output,
                    "A solution exists for this puzzle. Use 'help'/'help all' to see it."
                )?;
            }
            Verdict::NotTarget { value } => {
                writeln!(
                    self.output,
                    "Not {} (got {value}). Elapsed {time}. Try again or 'help'/'help all'/'skip'/'time'/'stop'.",
                    self.config.target
                )?;
            }
            Verdict::Rejected(CheckError::MultisetMismatch(diff)) => {
                writeln!(self.output, "You must use exactly these four numbers once each.")?;
                writeln!(
                    self.output,
                    "Expected: {:?}; Found: {:?} ({})",
                    diff.expected,
                    diff.found,
                    diff.summary()
                )?;
            }
            Verdict::Rejected(CheckError::DivisionByZero) => {
                writeln!(self.output, "Invalid: division by zero.")?;
            }
            Verdict::Rejected(err) => {
                writeln!(self.output, "{err}")?;
            }
        }
        Ok(verdict.is_correct())
    }

    pub fn print_report(&mut self, records: &[RoundRecord]) -> io::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        writeln!(self.output, "\nFinal Report")?;
        writeln!(self.output, "seqno, question, solved, time, attempts, used_help, solved_via")?;
        for record in records {
            let solved_via = match record.solved_via {
                Some(SolvedVia::Formula) => "formula",
                Some(SolvedVia::NoSolution) => "no-solution",
                None => "",
            };
            writeln!(
                self.output,
                "{}, {}, {}, {}, {}, {}, {}",
                record.seqno,
                record.question,
                yes_no(record.solved),
                format_secs(Duration::from_secs_f64(record.time_sec)),
                record.attempts,
                yes_no(record.used_help),
                solved_via
            )?;
        }
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// `42.0s` under a minute, `3m07.5s` above.
pub fn format_secs(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        return format!("{secs:.1}s");
    }
    let minutes = (secs / 60.0).floor();
    let rest = secs - minutes * 60.0;
    format!("{}m{rest:04.1}s", minutes as u64)
}
