use thiserror::Error;

/// Shared error type for all core operations.
///
/// Engine and service operations return these instead of panicking or
/// bubbling raw backend errors. The CLI layer wraps them with anyhow
/// context for display.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// One or more required fields missing or invalid. The operation
    /// performed no partial mutation.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// An operation referenced an application/interview that doesn't exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Storage layer failure. In-memory state may already have changed
    /// when this is returned (optimistic write, no rollback).
    #[error("storage error: {0}")]
    Storage(String),
}

impl TrackerError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("JSON: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
