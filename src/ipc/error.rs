use crate::error::GradebookError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn from_error(id: &str, e: &GradebookError) -> serde_json::Value {
    if matches!(e, GradebookError::Persistence(_) | GradebookError::Corrupt { .. }) {
        tracing::error!(error = %e, "storage failure");
    }
    err(id, e.code(), e.to_string(), e.details())
}
