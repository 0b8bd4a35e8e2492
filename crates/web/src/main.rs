mod api;

use anyhow::Context;
use api::{query_param, route, ApiReply, AppState, CheckRequest, HelpRequest};
use game24_data::{load_corpus, load_game_config, DEFAULT_CONFIG_FILE, DEFAULT_PUZZLES_FILE};
use std::path::PathBuf;
use std::sync::Arc;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:7878";

#[derive(Debug, Clone, PartialEq)]
struct WebOptions {
    addr: String,
    puzzles: PathBuf,
    config: PathBuf,
    seed: Option<u64>,
}

impl Default for WebOptions {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            puzzles: PathBuf::from(DEFAULT_PUZZLES_FILE),
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            seed: None,
        }
    }
}

fn parse_web_options(args: &[String]) -> Result<WebOptions, String> {
    let mut options = WebOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        let value = || {
            args.get(idx + 1)
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match flag {
            "--addr" => options.addr = value()?,
            "--puzzles" => options.puzzles = PathBuf::from(value()?),
            "--config" => options.config = PathBuf::from(value()?),
            "--seed" => {
                let raw = value()?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|_| format!("invalid seed: {raw}"))?;
                options.seed = Some(seed);
            }
            other => return Err(format!("unknown option: {other}")),
        }
        idx += 2;
    }
    Ok(options)
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_web_options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            eprintln!(
                "usage: game24-web [--addr HOST:PORT] [--puzzles FILE] [--config FILE] [--seed N]"
            );
            std::process::exit(2);
        }
    };
    if let Err(err) = serve(&options) {
        eprintln!("game24-web error: {err:#}");
        std::process::exit(1);
    }
}

fn serve(options: &WebOptions) -> anyhow::Result<()> {
    let mut config = load_game_config(&options.config)?;
    if options.seed.is_some() {
        config.picker.seed = options.seed;
    }
    let corpus = load_corpus(&options.puzzles)?;
    let state = Arc::new(AppState::new(corpus, config));
    let addr = options.addr.as_str();
    let server = Server::http(addr)
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("bind {addr}"))?;
    info!(addr, "24 points web server listening");
    for request in server.incoming_requests() {
        let state = Arc::clone(&state);
        if let Err(err) = handle_request(request, state) {
            warn!(error = %err, "request error");
        }
    }
    Ok(())
}

fn handle_request(
    mut request: tiny_http::Request,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = request.url().to_string();
    let reply = match (request.method(), route(&url)) {
        (&Method::Get, "/") => {
            return respond_with_file(request, web_path("index.html"), "text/html; charset=utf-8");
        }
        (&Method::Get, "/api/next") => state.next(query_param(&url, "level").as_deref()),
        (&Method::Post, "/api/check") => {
            let body = read_body(&mut request)?;
            match serde_json::from_str::<CheckRequest>(&body) {
                Ok(check) => state.check(&check),
                Err(err) => bad_request(&err),
            }
        }
        (&Method::Post, "/api/help") => {
            let body = read_body(&mut request)?;
            match serde_json::from_str::<HelpRequest>(&body) {
                Ok(help) => state.help(&help),
                Err(err) => bad_request(&err),
            }
        }
        (&Method::Post, "/api/restart") => state.restart(),
        (&Method::Post, "/api/exit") => state.exit(),
        _ => {
            request.respond(Response::empty(StatusCode(404)))?;
            return Ok(());
        }
    };
    respond_json(request, reply)
}

fn read_body(request: &mut tiny_http::Request) -> std::io::Result<String> {
    let mut body = String::new();
    request.as_reader().read_to_string(&mut body)?;
    Ok(body)
}

fn bad_request(err: &serde_json::Error) -> ApiReply {
    ApiReply {
        status: 400,
        body: serde_json::json!({ "error": format!("invalid request body: {err}") }),
    }
}

fn web_path(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("web")
        .join(file)
}

fn respond_with_file(
    request: tiny_http::Request,
    path: PathBuf,
    content_type: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read(path)?;
    let header =
        Header::from_bytes(&b"Content-Type"[..], content_type).map_err(|_| "invalid header")?;
    request.respond(Response::from_data(content).with_header(header))?;
    Ok(())
}

fn respond_json(
    request: tiny_http::Request,
    reply: ApiReply,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = serde_json::to_vec_pretty(&reply.body)?;
    let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .map_err(|_| "invalid header")?;
    let response = Response::from_data(body)
        .with_header(header)
        .with_status_code(StatusCode(reply.status));
    request.respond(response)?;
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
        let options = parse_web_options(&[]).expect("defaults");
        assert_eq!(options, WebOptions::default());
        assert_eq!(options.addr, DEFAULT_ADDR);
        assert_eq!(options.config, PathBuf::from("assets/game24.json"));
    }

    #[test]
    fn reads_every_flag() {
        let options = parse_web_options(&args(&[
            "--addr", "127.0.0.1:9000", "--puzzles", "p.json", "--config", "c.json", "--seed", "7",
        ]))
        .expect("parsed");
        assert_eq!(options.addr, "127.0.0.1:9000");
        assert_eq!(options.puzzles, PathBuf::from("p.json"));
        assert_eq!(options.config, PathBuf::from("c.json"));
        assert_eq!(options.seed, Some(7));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_web_options(&args(&["--addr"])).is_err());
        assert!(parse_web_options(&args(&["--seed", "x"])).is_err());
        assert!(parse_web_options(&args(&["--port", "80"])).is_err());
    }

    #[test]
    fn index_page_ships_with_the_crate() {
        assert!(web_path("index.html").is_file());
    }
}
