//! Rule-driven notification engine for live device telemetry.
//!
//! This crate owns the evaluation pipeline that turns raw feed events into
//! operator-facing notifications:
//!
//! - **[`Engine`]**: Single-owner actor holding the rule registry, settings,
//!   notification store and expiry timers. Events and presentation commands
//!   flow through one `mpsc` mailbox, so every event's pipeline
//!   (decode → evaluate → dedup → store → schedule) completes before the next
//!   message is looked at.
//!
//! - **[`DecodedPayload`]**: Keyed view over an opaque payload. Structured
//!   JSON objects decode as-is; anything else degrades to
//!   `{"rawPayload": <original>}`.
//!
//! - **[`evaluate`]**: Pure rule evaluation against explicit snapshots of
//!   the rule set and [`Settings`]. Every enabled rule is checked; any subset
//!   may fire for a single event.
//!
//! - **[`NotificationStore`]**: Bounded newest-first collection publishing
//!   snapshots through `tokio::sync::watch`, consumed via
//!   [`NotificationStream`].
//!
//! - **[`Command`]**: Typed mutation requests (mark-read, delete, rule CRUD,
//!   settings) routed to the engine task.

pub mod command;
pub mod decode;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod expiry;
pub mod model;
pub mod registry;
pub mod sink;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use decode::{DecodedPayload, RAW_PAYLOAD_KEY};
pub use dedup::{DEDUP_WINDOW, DedupGuard};
pub use engine::{Engine, EngineConfig};
pub use error::CoreError;
pub use registry::{RuleRegistry, RuleSnapshot, default_rules};
pub use sink::{AlertSink, DeliveryError, NullSink};
pub use store::{NotificationCounts, NotificationSnapshot, NotificationStore};
pub use stream::{NotificationFilter, NotificationStream, RuleStream, SnapshotStream};

pub use model::{
    Condition, Notification, NotificationKind, NotificationSpec, NotificationTemplate, Operator,
    Priority, RawEvent, Rule, RulePatch, SettingChange, Settings, SourceData, TopicPattern,
};
