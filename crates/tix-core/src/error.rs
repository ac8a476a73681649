//! Error types for tix

use crate::lifecycle::ClosureBlocked;
use thiserror::Error;

/// The record type an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Ticket,
    Task,
    Comment,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::User => write!(f, "User"),
            Entity::Ticket => write!(f, "Ticket"),
            Entity::Task => write!(f, "Task"),
            Entity::Comment => write!(f, "Comment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid status: '{0}' (expected Open or Closed)")]
    InvalidStatus(String),

    #[error("Invalid priority: '{0}' (expected LOW, MEDIUM, HIGH or SEVERE)")]
    InvalidPriority(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    #[error("{entity} already exists: {id}")]
    Conflict { entity: Entity, id: i64 },

    #[error("Cannot close ticket {ticket_id}: {reason}")]
    PreconditionFailed {
        ticket_id: i64,
        reason: ClosureBlocked,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Config(String),
}

/// Coarse classification used by callers to pick a response (HTTP status,
/// exit code) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    PreconditionFailed,
    Storage,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_)
            | Error::InvalidStatus(_)
            | Error::InvalidPriority(_)
            | Error::Json(_)
            | Error::Config(_) => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            Error::Storage(_) | Error::Io(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(entity: Entity, id: i64) -> Self {
        Error::NotFound { entity, id }
    }
}

/// Unwrap a field that arrived as optional input, reporting it by name.
pub fn required<T>(value: Option<T>, field: &str) -> crate::Result<T> {
    value.ok_or_else(|| Error::Validation(format!("missing required field '{field}'")))
}

/// Reject empty or whitespace-only text for a required field.
pub(crate) fn require_text(value: &str, field: &str) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!(
            "required field '{field}' must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
