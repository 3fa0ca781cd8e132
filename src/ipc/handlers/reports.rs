use crate::error::GradebookError;
use crate::ipc::error::{from_error, ok};
use crate::ipc::helpers::session;
use crate::ipc::types::{AppState, Request};
use crate::report;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_reports_build(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (_, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = profiles.records();
    match report::build_report(store.list_all(), &store.settings().grade_scale, Utc::now()) {
        Ok(model) => {
            let text = report::render_text(&model);
            ok(&req.id, json!({ "report": model, "text": text }))
        }
        Err(e) => from_error(&req.id, &e),
    }
}

fn handle_reports_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = req
        .params
        .get("outPath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let (_, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let records = profiles.records().list_all();
    let text = match report::to_tabular(records) {
        Ok(t) => t,
        Err(e) => return from_error(&req.id, &e),
    };

    if let Some(path) = &out_path {
        if let Err(e) = report::write_export(path, &text) {
            return from_error(&req.id, &GradebookError::Export(format!("{e:#}")));
        }
        info!(path = %path.to_string_lossy(), rows = records.len(), "csv export written");
    }

    ok(
        &req.id,
        json!({
            "fileName": report::export_file_name(Utc::now().date_naive()),
            "rowCount": records.len(),
            "csv": text,
            "writtenTo": out_path.map(|p| p.to_string_lossy().to_string()),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.build" => Some(handle_reports_build(state, req)),
        "reports.exportCsv" => Some(handle_reports_export_csv(state, req)),
        _ => None,
    }
}
