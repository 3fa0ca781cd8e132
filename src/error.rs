use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradebookError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("storage error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("stored value under {key} is not valid: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("export failed: {0}")]
    Export(String),

    #[error("select a workspace first")]
    NoWorkspace,
}

pub type Result<T> = std::result::Result<T, GradebookError>;

impl GradebookError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        GradebookError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        GradebookError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// Protocol error code sent back to the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            GradebookError::Validation { .. } => "bad_params",
            GradebookError::NotFound { .. } => "not_found",
            GradebookError::Persistence(_)
            | GradebookError::Corrupt { .. }
            | GradebookError::Export(_) => "persistence_failed",
            GradebookError::NoWorkspace => "no_workspace",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            GradebookError::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
            GradebookError::NotFound { what, id } => {
                Some(serde_json::json!({ "what": what, "id": id }))
            }
            GradebookError::Corrupt { key, .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        }
    }
}
