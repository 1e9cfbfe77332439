//! CLI error types with miette diagnostics.
//!
//! Maps core, feed and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pulsewatch_config::ConfigError;
use pulsewatch_core::CoreError;
use pulsewatch_feed::FeedError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Feed ─────────────────────────────────────────────────────────
    #[error("No telemetry feed configured")]
    #[diagnostic(
        code(pulsewatch::no_feed),
        help(
            "Pass --url ws://host/feed, set feed.url in the config file,\n\
             or replay a capture with --replay <file>."
        )
    )]
    NoFeed,

    #[error("Telemetry feed failed")]
    #[diagnostic(
        code(pulsewatch::feed),
        help("Check that the feed endpoint is reachable and speaks WebSocket.")
    )]
    Feed(#[from] FeedError),

    #[error("Telemetry feed at {url} closed")]
    #[diagnostic(
        code(pulsewatch::feed_closed),
        help("The feed gave up reconnecting. Raise feed.max_retries or check the endpoint.")
    )]
    FeedClosed { url: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(pulsewatch::not_found),
        help("Run: pulsewatch {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(pulsewatch::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pulsewatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(pulsewatch::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error("Configuration is invalid")]
    #[diagnostic(
        code(pulsewatch::config),
        help(
            "Fix the file, then check it with: pulsewatch rules validate\n\
             Environment overrides use PULSEWATCH_<SECTION>__<KEY>."
        )
    )]
    Config(#[from] ConfigError),

    // ── Engine ───────────────────────────────────────────────────────
    #[error("Notification engine error: {message}")]
    #[diagnostic(code(pulsewatch::engine))]
    Engine { message: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(pulsewatch::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoFeed | Self::Feed(_) | Self::FeedClosed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Config(_) => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RuleNotFound { id } => CliError::NotFound {
                resource_type: "rule".into(),
                identifier: id,
                list_command: "rules list".into(),
            },

            CoreError::NotificationNotFound { id } => CliError::NotFound {
                resource_type: "notification".into(),
                identifier: id.to_string(),
                list_command: "watch".into(),
            },

            CoreError::DuplicateRule { id } => CliError::Conflict {
                resource_type: "rule".into(),
                identifier: id,
            },

            CoreError::ValidationFailed { field, message } => CliError::Validation {
                field,
                reason: message,
            },

            CoreError::EngineStopped => CliError::Engine {
                message: "the engine stopped unexpectedly".into(),
            },

            CoreError::Internal(message) => CliError::Engine { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_keeps_the_offending_field() {
        let settings = CoreError::ValidationFailed {
            field: "max_notifications".into(),
            message: "must be greater than zero".into(),
        };
        let err = CliError::from(settings);
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert_eq!(
            err.to_string(),
            "Invalid value for max_notifications: must be greater than zero"
        );

        let rules = CliError::from(CoreError::ValidationFailed {
            field: "rules".into(),
            message: "rule id must not be empty".into(),
        });
        assert!(matches!(rules, CliError::Validation { ref field, .. } if field == "rules"));
    }
}
