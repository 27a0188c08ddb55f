use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::{info, warn};

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };

    if !state.auth.authenticate(&username, &password) {
        warn!(user = %username, "login rejected");
        return err(
            &req.id,
            "invalid_credentials",
            "Invalid username or password.",
            None,
        );
    }
    info!(user = %username, "logged in");
    state.user = Some(username.clone());
    ok(&req.id, json!({ "username": username }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(user) = state.user.take() {
        info!(user = %user, "logged out");
    }
    ok(&req.id, json!({ "loggedIn": false }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        _ => None,
    }
}
