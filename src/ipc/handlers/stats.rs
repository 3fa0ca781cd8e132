use crate::ipc::helpers::session;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::stats;
use serde_json::json;

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (_, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = profiles.records();
    let summary = stats::summarize(store.list_all(), &store.settings().grade_scale);
    ok(&req.id, json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.summary" => Some(handle_summary(state, req)),
        _ => None,
    }
}
