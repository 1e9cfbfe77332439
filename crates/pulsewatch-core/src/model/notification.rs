// ── Notification domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Visual/semantic class of a notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    /// Requires explicit acknowledgment; typically paired with no auto-expiry.
    Alert,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Priorities loud enough to warrant an audible cue.
    pub fn is_audible(self) -> bool {
        self >= Self::High
    }
}

/// Where a rule-produced notification came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceData {
    pub channel: String,

    /// The full decoded payload of the triggering event.
    pub value: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// A stored notification. Owned by the [`NotificationStore`](crate::NotificationStore);
/// only the `read` flag changes after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub priority: Priority,
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceData>,

    /// Seconds until the notification is marked read automatically; 0 never.
    #[serde(default)]
    pub auto_expire_seconds: u64,
}

impl Notification {
    pub fn channel(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.channel.as_str())
    }

    pub fn is_critical(&self) -> bool {
        self.priority == Priority::Critical
    }
}

/// A notification that has not been admitted to the store yet.
///
/// Produced by the rule evaluator, or supplied directly by the presentation
/// layer for synthetic/system notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSpec {
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub auto_expire_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceData>,
}

fn default_category() -> String {
    "system".into()
}

impl NotificationSpec {
    /// A plain system notification with default priority and no expiry.
    pub fn system(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            title: title.into(),
            message: message.into(),
            priority: Priority::Medium,
            category: default_category(),
            auto_expire_seconds: 0,
            source: None,
        }
    }

    pub fn channel(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.channel.as_str())
    }

    /// Stamp the spec with a fresh id and timestamp.
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind: self.kind,
            title: self.title,
            message: self.message,
            timestamp: now,
            read: false,
            priority: self.priority,
            category: self.category,
            source: self.source,
            auto_expire_seconds: self.auto_expire_seconds,
        }
    }
}
