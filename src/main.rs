mod config;
mod db;
mod engine;
mod ipc;

use std::io::{self, BufRead, Write};

use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;

fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_new(&cfg.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    // stdout carries the IPC protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cfg = Config::from_env();
    init_tracing(&cfg);

    let mut state = ipc::AppState::new(cfg.clone());
    if let Some(path) = cfg.workspace.as_ref() {
        match db::open_db(path, cfg.busy_timeout) {
            Ok(conn) => {
                info!(workspace = %path.display(), "workspace opened from environment");
                state.workspace = Some(path.clone());
                state.db = Some(conn);
            }
            Err(e) => warn!(workspace = %path.display(), error = %e, "startup workspace not opened"),
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "erpd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            // No id to echo back.
            Err(e) => json!({
                "ok": false,
                "error": { "code": "bad_json", "message": e.to_string() }
            }),
        };

        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed; exiting");
}
