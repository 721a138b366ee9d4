//! Error types for the safety system.

use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy for the safety subsystem.
///
/// Permission and timeout failures are ordinary values here, never panics:
/// a safety action proceeds without its enhancement rather than aborting.
#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("{0} permission not granted")]
    PermissionDenied(&'static str),

    #[error("{0} request timed out")]
    Timeout(&'static str),

    #[error("No last known location available")]
    NoLastKnown,

    #[error("Location provider error: {0}")]
    Provider(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Contact not found: {0}")]
    ContactNotFound(Uuid),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
