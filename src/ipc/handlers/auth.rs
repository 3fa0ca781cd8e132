use crate::ipc::error::{err, from_error, ok};
use crate::ipc::helpers::{required_str, session};
use crate::ipc::types::{AppState, Request};
use crate::profile::{LoginForm, ProfileStore};
use chrono::Utc;
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let form: LoginForm = match serde_json::from_value(req.params.clone()) {
        Ok(f) => f,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    match profiles.login(conn, &form, Utc::now()) {
        Ok((teacher, created)) => ok(
            &req.id,
            json!({
                "teacher": teacher,
                "created": created,
                "assessmentCount": profiles.records().len(),
            }),
        ),
        Err(e) => from_error(&req.id, &e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match profiles.logout(conn) {
        Ok(previous) => ok(
            &req.id,
            json!({ "loggedOut": previous.is_some(), "teacher": previous }),
        ),
        Err(e) => from_error(&req.id, &e),
    }
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let idle_timeout = state.config.idle_timeout;
    let (_, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let expires_at = profiles
        .active_profile()
        .map(|_| profiles.last_activity() + idle_timeout);
    ok(
        &req.id,
        json!({
            "teacher": profiles.active_profile(),
            "lastActivity": profiles.last_activity(),
            "expiresAt": expires_at,
            "lastSaved": profiles.records().last_saved(),
        }),
    )
}

fn handle_touch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (_, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // The router already counted this request as activity.
    ok(
        &req.id,
        json!({
            "active": profiles.active_profile().is_some(),
            "lastActivity": profiles.last_activity(),
        }),
    )
}

fn handle_profiles_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, _) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ProfileStore::list_profiles(conn) {
        Ok(emails) => ok(
            &req.id,
            json!({ "count": emails.len(), "profiles": emails }),
        ),
        Err(e) => from_error(&req.id, &e),
    }
}

fn handle_profiles_delete_data(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (conn, profiles) = match session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match profiles.delete_profile_data(conn, email.trim()) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => from_error(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.current" => Some(handle_current(state, req)),
        "session.touch" => Some(handle_touch(state, req)),
        "profiles.list" => Some(handle_profiles_list(state, req)),
        "profiles.deleteData" => Some(handle_profiles_delete_data(state, req)),
        _ => None,
    }
}
