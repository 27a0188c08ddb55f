use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_path, session_store};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match session_store(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(out_path) = optional_path(req, "outPath") else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };

    match backup::export_roster_bundle(store.path(), &PathBuf::from(&out_path)) {
        Ok(summary) => {
            info!(path = %out_path, "roster bundle exported");
            ok(
                &req.id,
                json!({
                    "path": out_path,
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count,
                    "sha256": summary.sha256,
                }),
            )
        }
        Err(e) => err(
            &req.id,
            "backup_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path })),
        ),
    }
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match session_store(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(in_path) = optional_path(req, "inPath") else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };

    let checked = backup::import_roster_bundle(&PathBuf::from(&in_path), store.path(), |bytes| {
        roster::parse_csv(bytes)
            .map(|_| ())
            .map_err(|reason| anyhow::anyhow!(reason))
    });
    match checked {
        Ok(summary) => {
            let outcome = store.load(state.default_subjects);
            state.roster = outcome.roster;
            info!(
                path = %in_path,
                students = state.roster.len(),
                "roster bundle imported"
            );
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "studentCount": state.roster.len(),
                    "subjects": state.roster.subjects(),
                    "warning": outcome.warning,
                }),
            )
        }
        Err(e) => err(
            &req.id,
            "backup_failed",
            format!("{e:#}"),
            Some(json!({ "path": in_path })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
