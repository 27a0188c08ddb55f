use super::error::err;
use super::types::{AppState, Request};
use crate::roster::RosterStore;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_path(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Roster methods need a logged-in user and then a workspace, checked in
/// that order. The store is cloned so the caller can still mutate `state`.
pub fn session_store(state: &AppState, req: &Request) -> Result<RosterStore, serde_json::Value> {
    if state.user.is_none() {
        return Err(err(&req.id, "not_logged_in", "log in first", None));
    }
    state
        .store
        .clone()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}
