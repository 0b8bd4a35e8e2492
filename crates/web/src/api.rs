use game24_core::{
    judge_answer, CheckError, ErrorKind, GameConfig, PickError, PuzzleCorpus,
    PuzzlePicker, RngState, Served, SharedPicker, Verdict,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

pub struct AppState {
    corpus: Arc<PuzzleCorpus>,
    picker: SharedPicker,
    config: GameConfig,
    help_rng: Mutex<RngState>,
}

/// Status code plus JSON body, kept apart from the transport for testing.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    fn ok<T: Serialize>(body: T) -> Self {
        Self::with_status(200, body)
    }

    fn with_status<T: Serialize>(status: u16, body: T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(err) => Self {
                status: 500,
                body: json!({ "error": err.to_string() }),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NextResponse {
    pub seq: u64,
    pub ranks: Vec<String>,
    pub values: Vec<u8>,
    pub question: String,
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub values: Vec<i64>,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct CheckResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HelpRequest {
    pub values: Vec<i64>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HelpResponse {
    pub solutions: Vec<String>,
    pub has_solution: bool,
}

impl AppState {
    pub fn new(corpus: PuzzleCorpus, config: GameConfig) -> Self {
        let corpus = Arc::new(corpus);
        let picker = PuzzlePicker::new(Arc::clone(&corpus), config.picker.clone());
        let help_rng = RngState::from_seed(picker.seed().wrapping_add(1));
        info!(seed = picker.seed(), puzzles = corpus.len(), "app state ready");
        Self {
            corpus,
            picker: SharedPicker::new(picker),
            config,
            help_rng: Mutex::new(help_rng),
        }
    }

    pub fn next(&self, level: Option<&str>) -> ApiReply {
        let token = level.unwrap_or("easy");
        match self.picker.serve(token) {
            Ok(Served { seq, puzzle }) => {
                debug!(seq, question = %puzzle.question(), "next puzzle");
                ApiReply::ok(NextResponse {
                    seq,
                    ranks: puzzle.ranks(),
                    values: puzzle.values.to_vec(),
                    question: puzzle.question(),
                    level: puzzle.level.label().to_string(),
                })
            }
            Err(err @ PickError::UnknownDifficulty(_)) => {
                ApiReply::with_status(400, json!({ "error": err.to_string() }))
            }
            Err(PickError::NoEligiblePuzzle(difficulty)) => ApiReply::with_status(
                404,
                json!({
                    "error": ErrorKind::NoEligiblePuzzle.code(),
                    "difficulty": difficulty,
                }),
            ),
        }
    }

    pub fn check(&self, request: &CheckRequest) -> ApiReply {
        let solutions = self
            .corpus
            .find_by_values(&request.values)
            .map(|puzzle| puzzle.solutions.as_slice())
            .unwrap_or(&[]);
        let verdict = judge_answer(&request.values, solutions, &request.answer, &self.config);
        ApiReply::ok(self.check_response(&request.values, verdict))
    }

    fn check_response(&self, values: &[i64], verdict: Verdict) -> CheckResponse {
        match verdict {
            Verdict::Solved { value } => CheckResponse {
                ok: true,
                value: Some(value),
                kind: Some("formula".into()),
                ..CheckResponse::default()
            },
            Verdict::NoSolution => CheckResponse {
                ok: true,
                kind: Some("no-solution".into()),
                ..CheckResponse::default()
            },
            Verdict::SolutionExists => CheckResponse {
                reason: Some(
                    "Try 'help' to see a solution example, 'help all' to see all solutions.".into(),
                ),
                kind: Some("help-available".into()),
                ..CheckResponse::default()
            },
            Verdict::NotTarget { value } => CheckResponse {
                value: Some(value),
                reason: Some(format!("Not {} (got {value}).", self.config.target)),
                ..CheckResponse::default()
            },
            Verdict::Rejected(err) => {
                let reason = match &err {
                    CheckError::MultisetMismatch(diff) => format!(
                        "You must use exactly these numbers {values:?}. Found {:?} ({}).",
                        diff.found,
                        diff.summary()
                    ),
                    CheckError::DivisionByZero => "Division by zero.".to_string(),
                    CheckError::UnsafeExpression(detail) => format!("Invalid expression: {detail}"),
                };
                CheckResponse {
                    reason: Some(reason),
                    kind: Some(err.kind().code().into()),
                    ..CheckResponse::default()
                }
            }
        }
    }

    pub fn help(&self, request: &HelpRequest) -> ApiReply {
        let solutions = self
            .corpus
            .find_by_values(&request.values)
            .map(|puzzle| puzzle.solutions.clone())
            .unwrap_or_default();
        if solutions.is_empty() {
            return ApiReply::ok(HelpResponse {
                solutions,
                has_solution: false,
            });
        }
        let shown = if request.all {
            solutions
        } else {
            let mut rng = self.help_rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.choose(&solutions).cloned().into_iter().collect()
        };
        ApiReply::ok(HelpResponse {
            solutions: shown,
            has_solution: true,
        })
    }

    pub fn restart(&self) -> ApiReply {
        self.picker.reset();
        info!("pool reset");
        ApiReply::ok(json!({ "ok": true, "msg": "Pool reset" }))
    }

    pub fn exit(&self) -> ApiReply {
        info!(served = self.picker.served(), "session ended");
        ApiReply::ok(json!({ "ok": true, "msg": "Session ended" }))
    }
}

/// Percent-decoded value of `key` in the query part of `url`, if present.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == key)
        .map(|(_, value)| percent_decode(value))
}

/// Decodes `+` and `%XX` escapes; malformed escapes are kept as written.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0usize;
    while idx < bytes.len() {
        match bytes[idx] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = raw
                    .get(idx + 1..idx + 3)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        idx += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        idx += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Path part of `url`, without the query.
pub fn route(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}
