// ── Derived notification counts ──

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Notification;

/// Read-only summary of a set of notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationCounts {
    pub total: usize,
    pub unread: usize,
    pub critical_unread: usize,
    pub unread_by_category: BTreeMap<String, usize>,
}

impl NotificationCounts {
    pub fn from_notifications<'a>(notifications: impl IntoIterator<Item = &'a Notification>) -> Self {
        let mut counts = Self::default();
        for n in notifications {
            counts.total += 1;
            if n.read {
                continue;
            }
            counts.unread += 1;
            if n.is_critical() {
                counts.critical_unread += 1;
            }
            *counts
                .unread_by_category
                .entry(n.category.clone())
                .or_default() += 1;
        }
        counts
    }

    pub fn unread_in(&self, category: &str) -> usize {
        self.unread_by_category.get(category).copied().unwrap_or(0)
    }
}
