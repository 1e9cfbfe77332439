// ── Domain model ──
//
// Canonical types shared by the engine, the feed adapters and the CLI.

pub mod event;
pub mod notification;
pub mod rule;
pub mod settings;

pub use event::RawEvent;
pub use notification::{Notification, NotificationKind, NotificationSpec, Priority, SourceData};
pub use rule::{Condition, NotificationTemplate, Operator, Rule, RulePatch, TopicPattern};
pub use settings::{SettingChange, Settings};
