use crate::grade::GradeScale;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

pub const DEFAULT_IDLE_TIMEOUT_SECS: i64 = 30 * 60;
pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const DEFAULT_MAX_SCORE: f64 = 100.0;

/// Process-wide knobs, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub idle_timeout: chrono::Duration,
    pub recent_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            idle_timeout: chrono::Duration::seconds(DEFAULT_IDLE_TIMEOUT_SECS),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl AppConfig {
    /// `GRADEBOOK_IDLE_TIMEOUT_SECS` and `GRADEBOOK_RECENT_LIMIT` override the
    /// defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(raw) = lookup("GRADEBOOK_IDLE_TIMEOUT_SECS") {
            match raw.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => cfg.idle_timeout = chrono::Duration::seconds(secs),
                _ => warn!(value = %raw, "ignoring invalid GRADEBOOK_IDLE_TIMEOUT_SECS"),
            }
        }
        if let Some(raw) = lookup("GRADEBOOK_RECENT_LIMIT") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => cfg.recent_limit = n,
                _ => warn!(value = %raw, "ignoring invalid GRADEBOOK_RECENT_LIMIT"),
            }
        }
        cfg
    }
}

/// Settings stored alongside a profile's assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    #[serde(default, deserialize_with = "lenient_scale")]
    pub grade_scale: GradeScale,
    #[serde(default = "default_max_score")]
    pub default_max_score: f64,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            grade_scale: GradeScale::default(),
            default_max_score: DEFAULT_MAX_SCORE,
        }
    }
}

fn default_max_score() -> f64 {
    DEFAULT_MAX_SCORE
}

// Invalid stored scales fall back to the default.
fn lenient_scale<'de, D>(deserializer: D) -> Result<GradeScale, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    match serde_json::from_value::<GradeScale>(raw) {
        Ok(scale) => Ok(scale),
        Err(e) => {
            warn!(error = %e, "stored grade scale is invalid; using default scale");
            Ok(GradeScale::default())
        }
    }
}
