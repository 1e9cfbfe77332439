// ── Core error types ──
//
// Errors surfaced to callers of the engine's command API. The event
// pipeline itself never returns these: decode and evaluation faults
// degrade locally and are only logged.

use thiserror::Error;
use uuid::Uuid;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Rule registry ────────────────────────────────────────────────
    #[error("Rule not found: {id}")]
    RuleNotFound { id: String },

    #[error("Rule already exists: {id}")]
    DuplicateRule { id: String },

    // ── Notification store ───────────────────────────────────────────
    #[error("Notification not found: {id}")]
    NotificationNotFound { id: Uuid },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid {field}: {message}")]
    ValidationFailed { field: String, message: String },

    // ── Engine lifecycle ─────────────────────────────────────────────
    #[error("Notification engine is not running")]
    EngineStopped,

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }
}
