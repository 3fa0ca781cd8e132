use crate::error::GradebookError;
use crate::grade::GradeScale;
use crate::ipc::error::{err, from_error};
use crate::ipc::types::{AppState, Request};
use crate::profile::ProfileStore;
use crate::record::AssessmentRecord;
use rusqlite::Connection;
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    let v = req.params.get(key);
    v.and_then(|v| v.as_i64())
        .or_else(|| v.and_then(|v| v.as_str()).and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_usize(req: &Request, key: &str) -> Result<Option<usize>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    format!("{} must be a non-negative integer", key),
                    None,
                )
            }),
    }
}

/// Connection and profile store of the open workspace.
pub fn session<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<(&'a Connection, &'a mut ProfileStore), serde_json::Value> {
    match (state.db.as_ref(), state.profiles.as_mut()) {
        (Some(conn), Some(profiles)) => Ok((conn, profiles)),
        _ => Err(from_error(&req.id, &GradebookError::NoWorkspace)),
    }
}

pub fn record_json(record: &AssessmentRecord, scale: &GradeScale) -> serde_json::Value {
    let mut v = json!(record);
    v["gradeColor"] = json!(scale.color_of(&record.grade));
    v
}
