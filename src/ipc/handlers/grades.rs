use crate::grade::GradeScale;
use crate::ipc::error::{err, from_error, ok};
use crate::ipc::helpers::required_i64;
use crate::ipc::types::{AppState, Request};
use crate::record::NumberField;
use serde_json::json;

/// Scale of the active slot; the default scale before a workspace is open.
fn active_scale(state: &AppState) -> GradeScale {
    state
        .profiles
        .as_ref()
        .map(|p| p.records().settings().grade_scale.clone())
        .unwrap_or_default()
}

fn number_param(req: &Request, key: &str) -> Option<f64> {
    serde_json::from_value::<NumberField>(req.params.get(key)?.clone())
        .ok()?
        .value()
}

fn handle_scale(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scale = active_scale(state);
    ok(&req.id, json!({ "tiers": scale.tiers() }))
}

fn handle_classify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let percentage = match required_i64(req, "percentage") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let scale = active_scale(state);
    let grade = scale.classify(percentage);
    ok(
        &req.id,
        json!({
            "percentage": percentage,
            "grade": grade,
            "color": scale.color_of(grade),
            "tier": scale.tier_of(grade),
        }),
    )
}

fn handle_preview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(score) = number_param(req, "score") else {
        return err(&req.id, "bad_params", "Please enter a valid score", None);
    };
    let scale = active_scale(state);
    let max_score = match req.params.get("maxScore") {
        None => state
            .profiles
            .as_ref()
            .map(|p| p.records().settings().default_max_score)
            .unwrap_or(crate::config::DEFAULT_MAX_SCORE),
        Some(_) => match number_param(req, "maxScore") {
            Some(m) => m,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "Please enter a valid maximum score",
                    None,
                )
            }
        },
    };
    match scale.preview(score, max_score) {
        Ok(p) => ok(&req.id, json!(p)),
        Err(e) => from_error(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.scale" => Some(handle_scale(state, req)),
        "grades.classify" => Some(handle_classify(state, req)),
        "grades.preview" => Some(handle_preview(state, req)),
        _ => None,
    }
}
