use crate::ipc::error::{err, from_error, ok};
use crate::ipc::helpers::{optional_usize, record_json, required_i64, session};
use crate::ipc::types::{AppState, Request};
use crate::record::RecordInput;
use chrono::Utc;
use serde_json::json;

fn record_input(req: &Request, default_max_score: f64) -> Result<RecordInput, serde_json::Value> {
    RecordInput::from_params(&req.params, default_max_score).map_err(|e| from_error(&req.id, &e))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = profiles.records_mut();
    let input = match record_input(req, store.settings().default_max_score) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.create(conn, &input, Utc::now()) {
        Ok(record) => ok(
            &req.id,
            json!({ "assessment": record_json(&record, &store.settings().grade_scale) }),
        ),
        Err(e) => from_error(&req.id, &e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_i64(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (conn, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = profiles.records_mut();
    let input = match record_input(req, store.settings().default_max_score) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.edit(conn, id, &input) {
        Ok(record) => ok(
            &req.id,
            json!({ "assessment": record_json(&record, &store.settings().grade_scale) }),
        ),
        Err(e) => from_error(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_i64(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (conn, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match profiles.records_mut().delete(conn, id) {
        Ok(removed) => ok(&req.id, json!({ "deletedId": removed.id })),
        Err(e) => from_error(&req.id, &e),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_i64(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (_, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = profiles.records();
    match store.get(id) {
        Some(r) => ok(
            &req.id,
            json!({ "assessment": record_json(r, &store.settings().grade_scale) }),
        ),
        None => err(
            &req.id,
            "not_found",
            format!("assessment not found: {id}"),
            Some(json!({ "what": "assessment", "id": id.to_string() })),
        ),
    }
}

fn handle_recent(state: &mut AppState, req: &Request) -> serde_json::Value {
    let limit = match optional_usize(req, "limit") {
        Ok(v) => v.unwrap_or(state.config.recent_limit),
        Err(e) => return e,
    };
    let (_, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = profiles.records();
    let scale = &store.settings().grade_scale;
    let rows: Vec<_> = store
        .list_recent(limit)
        .into_iter()
        .map(|r| record_json(r, scale))
        .collect();
    ok(
        &req.id,
        json!({ "assessments": rows, "total": store.len() }),
    )
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (_, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = profiles.records();
    let scale = &store.settings().grade_scale;
    let rows: Vec<_> = store
        .list_all()
        .iter()
        .map(|r| record_json(r, scale))
        .collect();
    ok(&req.id, json!({ "assessments": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assessments.create" => Some(handle_create(state, req)),
        "assessments.update" => Some(handle_update(state, req)),
        "assessments.delete" => Some(handle_delete(state, req)),
        "assessments.get" => Some(handle_get(state, req)),
        "assessments.recent" => Some(handle_recent(state, req)),
        "assessments.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
