use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::session_store;
use crate::ipc::types::{AppState, Request};
use crate::roster::{subject_count_in_range, Roster, MAX_SUBJECTS, MIN_SUBJECTS};
use serde_json::json;
use tracing::{info, warn};

fn handle_subjects_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_store(state, req) {
        return e;
    }
    ok(
        &req.id,
        json!({
            "subjects": state.roster.subjects(),
            "locked": !state.roster.is_empty(),
        }),
    )
}

/// The subject set is pinned once a roster has records.
fn handle_subjects_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_store(state, req) {
        return e;
    }
    let count = match req.params.get("count").and_then(|v| v.as_u64()) {
        Some(v) => v as usize,
        None => return err(&req.id, "bad_params", "missing count", None),
    };
    if !subject_count_in_range(count) {
        return err(
            &req.id,
            "bad_params",
            format!("count must be between {MIN_SUBJECTS} and {MAX_SUBJECTS}"),
            Some(json!({ "count": count })),
        );
    }
    if count == state.roster.subjects().len() {
        return ok(&req.id, json!({ "subjects": state.roster.subjects() }));
    }
    if !state.roster.is_empty() {
        return err(
            &req.id,
            "subjects_locked",
            "clear the roster before changing the number of subjects",
            Some(json!({
                "current": state.roster.subjects().len(),
                "studentCount": state.roster.len(),
            })),
        );
    }

    state.roster = Roster::with_subject_count(count);
    ok(&req.id, json!({ "subjects": state.roster.subjects() }))
}

fn raw_score(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn handle_students_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match session_store(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(raw_scores) = req.params.get("scores").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing scores", None);
    };
    let raw_scores: Vec<String> = raw_scores.iter().map(raw_score).collect();
    let name = req.params.get("name").and_then(|v| v.as_str());

    let record = match calc::build_record(name, &raw_scores, state.roster.subjects()) {
        Ok(r) => r,
        Err(e) => {
            info!(fields = ?e.fields(), "submission rejected");
            return err(
                &req.id,
                "validation_failed",
                e.to_string(),
                Some(json!({ "errors": e.errors })),
            )
        }
    };

    match store.append(&state.roster, record.clone()) {
        Ok(next) => {
            state.roster = next;
            info!(
                student = %record.name(),
                average = record.average(),
                grade = %record.grade(),
                "student added"
            );
            ok(
                &req.id,
                json!({ "student": record, "studentCount": state.roster.len() }),
            )
        }
        Err(e) => {
            warn!(error = %e, "student not added");
            err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": store.path().to_string_lossy() })),
            )
        }
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_store(state, req) {
        return e;
    }
    ok(
        &req.id,
        json!({
            "subjects": state.roster.subjects(),
            "students": state.roster.records(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.get" => Some(handle_subjects_get(state, req)),
        "subjects.set" => Some(handle_subjects_set(state, req)),
        "students.add" => Some(handle_students_add(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        _ => None,
    }
}
