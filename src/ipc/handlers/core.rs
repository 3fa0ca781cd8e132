use crate::db;
use crate::ipc::error::{err, from_error, ok};
use crate::ipc::types::{AppState, Request};
use crate::profile::ProfileStore;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "idleTimeoutSecs": state.config.idle_timeout.num_seconds(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };
    let profiles = match ProfileStore::open(&conn, Utc::now()) {
        Ok(p) => p,
        Err(e) => return from_error(&req.id, &e),
    };

    let active = profiles.active_profile().cloned();
    info!(
        workspace = %path.to_string_lossy(),
        active = active.as_ref().map(|p| p.email_key.as_str()).unwrap_or("-"),
        "workspace opened"
    );
    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.profiles = Some(profiles);
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "teacher": active,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
