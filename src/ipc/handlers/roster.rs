use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_path, session_store};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_roster_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match session_store(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match store.clear(state.roster.subjects()) {
        Ok(empty) => {
            info!(removed = state.roster.len(), "roster cleared");
            state.roster = empty;
            ok(&req.id, json!({ "studentCount": 0 }))
        }
        Err(e) => err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": store.path().to_string_lossy() })),
        ),
    }
}

fn handle_roster_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_store(state, req) {
        return e;
    }
    let bytes = match roster::export_csv(&state.roster) {
        Ok(b) => b,
        Err(e) => return err(&req.id, "io_failed", e.to_string(), None),
    };

    let out_path = optional_path(req, "outPath");
    if let Some(p) = out_path.as_ref() {
        let out = PathBuf::from(p);
        if let Some(parent) = out.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return err(&req.id, "io_failed", e.to_string(), Some(json!({ "path": p })));
            }
        }
        if let Err(e) = std::fs::write(&out, &bytes) {
            return err(&req.id, "io_failed", e.to_string(), Some(json!({ "path": p })));
        }
    }

    ok(
        &req.id,
        json!({
            "csv": String::from_utf8_lossy(&bytes),
            "rowsExported": state.roster.len(),
            "path": out_path,
        }),
    )
}

fn handle_roster_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_store(state, req) {
        return e;
    }
    ok(&req.id, json!(calc::class_stats(state.roster.records())))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.clear" => Some(handle_roster_clear(state, req)),
        "roster.export" => Some(handle_roster_export(state, req)),
        "roster.stats" => Some(handle_roster_stats(state, req)),
        _ => None,
    }
}
