use super::handlers;
use super::types::{AppState, Request};
use crate::error::GradebookError;
use crate::ipc::error::{err, from_error};
use chrono::Utc;
use tracing::{debug, warn};

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    debug!(id = %req.id, method = %req.method, "request");
    if let Err(e) = apply_idle_timeout(state, &req) {
        if req.method != "health" {
            return from_error(&req.id, &e);
        }
    }

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::grades::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::assessments::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::stats::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

/// Expires a stale session before the request runs, then counts the request
/// as activity. `health` probes do not reset the timer. A failed expiry leaves
/// the clock untouched so the next request retries it.
fn apply_idle_timeout(state: &mut AppState, req: &Request) -> Result<(), GradebookError> {
    let (Some(conn), Some(profiles)) = (state.db.as_ref(), state.profiles.as_mut()) else {
        return Ok(());
    };
    let now = Utc::now();
    if let Err(e) = profiles.expire_if_idle(conn, now, state.config.idle_timeout) {
        warn!(error = %e, "idle logout failed; session kept");
        return Err(e);
    }
    if req.method != "health" {
        profiles.touch(now);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::open_memory;
    use crate::profile::{LoginForm, ProfileStore};
    use serde_json::json;

    fn request(id: &str, method: &str) -> Request {
        Request {
            id: id.to_string(),
            method: method.to_string(),
            params: json!({}),
        }
    }

    #[test]
    fn failed_idle_logout_is_reported_and_retried() {
        let conn = open_memory();
        let start = Utc::now() - chrono::Duration::hours(2);
        let mut profiles = ProfileStore::open(&conn, start).expect("open");
        let form = LoginForm {
            email: "t@school.edu".into(),
            password: "secret1".into(),
            name: "Abena Owusu".into(),
            school: "Accra Academy".into(),
        };
        profiles.login(&conn, &form, start).expect("login");
        conn.execute_batch("DROP TABLE kv_store;").expect("drop");

        let mut state = AppState::new(AppConfig::default());
        state.db = Some(conn);
        state.profiles = Some(profiles);

        for id in ["1", "2"] {
            let resp = handle_request(&mut state, request(id, "assessments.list"));
            assert_eq!(resp["ok"], json!(false));
            assert_eq!(resp["error"]["code"], json!("persistence_failed"));
            let profiles = state.profiles.as_ref().expect("profiles");
            assert!(profiles.active_profile().is_some());
            assert_eq!(profiles.last_activity(), start);
        }

        let health = handle_request(&mut state, request("3", "health"));
        assert_eq!(health["ok"], json!(true));
    }
}
