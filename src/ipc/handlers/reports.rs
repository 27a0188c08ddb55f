use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_path, required_str, session_store};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_reports_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_store(state, req) {
        return e;
    }
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(record) = state.roster.find(&name) else {
        return err(
            &req.id,
            "not_found",
            format!("no student named {:?}", name.trim()),
            None,
        );
    };

    let report = state.reports.render(record, state.roster.subjects());
    let out_path = optional_path(req, "outPath");
    if let Some(p) = out_path.as_ref() {
        let out = PathBuf::from(p);
        if let Some(parent) = out.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return err(&req.id, "io_failed", e.to_string(), Some(json!({ "path": p })));
            }
        }
        if let Err(e) = std::fs::write(&out, &report.body) {
            return err(&req.id, "io_failed", e.to_string(), Some(json!({ "path": p })));
        }
    }

    ok(
        &req.id,
        json!({
            "fileName": report.file_name,
            "mediaType": report.media_type,
            "text": String::from_utf8_lossy(&report.body),
            "path": out_path,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.student" => Some(handle_reports_student(state, req)),
        _ => None,
    }
}
