// ── Command API ──
//
// Every mutation of engine state flows through a `Command`. The engine
// task applies them one at a time, interleaved with feed events.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Notification, NotificationSpec, RawEvent, Rule, RulePatch, SettingChange, Settings};

/// A command envelope sent through the engine mailbox.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All operations the presentation layer can request.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Event intake ─────────────────────────────────────────────────
    /// Run one raw event through the full evaluation pipeline.
    Ingest(RawEvent),

    /// Store a synthetic notification (subject to dedup).
    AddNotification(NotificationSpec),

    // ── Notification lifecycle ───────────────────────────────────────
    MarkAsRead {
        id: Uuid,
    },
    MarkAsUnread {
        id: Uuid,
    },
    DeleteNotification {
        id: Uuid,
    },
    ClearAll,
    ClearByCategory {
        category: String,
    },
    MarkAllAsRead,

    // ── Rule registry ────────────────────────────────────────────────
    AddRule(Rule),
    UpdateRule {
        id: String,
        patch: RulePatch,
    },
    DeleteRule {
        id: String,
    },
    SetRuleEnabled {
        id: String,
        enabled: bool,
    },

    // ── Settings ─────────────────────────────────────────────────────
    UpdateSettings(SettingChange),
}

/// Result of a successfully executed command.
#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    /// Notifications stored by an ingest or add; empty when everything was
    /// filtered or deduplicated.
    Created(Vec<Arc<Notification>>),
    /// Ids touched by a bulk operation.
    Affected(Vec<Uuid>),
    Rule(Arc<Rule>),
    Settings(Settings),
}

impl CommandResult {
    /// Notifications created by the command, if any.
    pub fn created(&self) -> &[Arc<Notification>] {
        match self {
            Self::Created(list) => list,
            _ => &[],
        }
    }
}
