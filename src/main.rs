mod auth;
mod backup;
mod calc;
mod config;
mod ipc;
mod logging;
mod report;
mod roster;
mod validate;

use anyhow::Context;
use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    let cfg = config::Config::parse();
    cfg.validate()?;
    logging::init_tracing(&cfg.log_level, cfg.log_json)?;

    let creds = cfg.credentials().context("failed to load credentials")?;
    let mut state = ipc::AppState::new(
        cfg.subjects,
        Box::new(creds),
        Box::new(report::TextReport::default()),
    );
    if let Some(ws) = cfg.workspace.as_ref() {
        if let Some(w) = state
            .select_workspace(ws)
            .with_context(|| format!("failed to open workspace {}", ws.to_string_lossy()))?
        {
            warn!(warning = %w, "workspace opened with a warning");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "gradebookd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to answer with.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
