use std::path::PathBuf;

use crate::config::AppConfig;
use crate::profile::ProfileStore;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Session context threaded through every handler. `db` and `profiles` are
/// set together by `workspace.select`.
pub struct AppState {
    pub config: AppConfig,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub profiles: Option<ProfileStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            workspace: None,
            db: None,
            profiles: None,
        }
    }
}
