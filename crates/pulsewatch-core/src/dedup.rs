// ── Duplicate alert suppression ──
//
// Drops a candidate when the live store already holds a logically
// identical alert (same title, same source channel) from within the
// window. Counts are not coalesced; the later duplicate is simply dropped.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::model::{Notification, NotificationSpec};

/// Window during which identical alerts are suppressed.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct DedupGuard {
    window: TimeDelta,
}

impl Default for DedupGuard {
    fn default() -> Self {
        Self::new(DEDUP_WINDOW)
    }
}

impl DedupGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn window(&self) -> Duration {
        self.window.to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether `candidate` duplicates any notification in `live`.
    ///
    /// Two notifications are identical when their titles match and their
    /// source channels match (two synthetic notifications without a source
    /// share the absent channel).
    pub fn is_duplicate<'a>(
        &self,
        candidate: &NotificationSpec,
        live: impl IntoIterator<Item = &'a Notification>,
        now: DateTime<Utc>,
    ) -> bool {
        live.into_iter().any(|existing| {
            existing.title == candidate.title
                && existing.channel() == candidate.channel()
                && now.signed_duration_since(existing.timestamp) < self.window
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceData;

    fn spec(title: &str, channel: Option<&str>) -> NotificationSpec {
        let mut s = NotificationSpec::system(title, "msg");
        s.source = channel.map(|c| SourceData {
            channel: c.into(),
            value: serde_json::json!({}),
            connection_id: None,
            device_id: None,
        });
        s
    }

    #[test]
    fn identical_within_window_is_duplicate() {
        let guard = DedupGuard::default();
        let t0 = Utc::now();
        let stored = vec![spec("High temp", Some("sensors/x")).into_notification(t0)];

        let later = t0 + TimeDelta::seconds(10);
        assert!(guard.is_duplicate(&spec("High temp", Some("sensors/x")), &stored, later));
    }

    #[test]
    fn different_channel_or_title_is_not_duplicate() {
        let guard = DedupGuard::default();
        let t0 = Utc::now();
        let stored = vec![spec("High temp", Some("sensors/x")).into_notification(t0)];

        assert!(!guard.is_duplicate(&spec("High temp", Some("sensors/y")), &stored, t0));
        assert!(!guard.is_duplicate(&spec("Low temp", Some("sensors/x")), &stored, t0));
        assert!(!guard.is_duplicate(&spec("High temp", None), &stored, t0));
    }

    #[test]
    fn outside_window_is_not_duplicate() {
        let guard = DedupGuard::default();
        let t0 = Utc::now();
        let stored = vec![spec("High temp", Some("sensors/x")).into_notification(t0)];

        let later = t0 + TimeDelta::seconds(31);
        assert!(!guard.is_duplicate(&spec("High temp", Some("sensors/x")), &stored, later));
    }

    #[test]
    fn repeat_exactly_at_window_edge_is_admitted() {
        let guard = DedupGuard::default();
        let t0 = Utc::now();
        let stored = vec![spec("High temp", Some("sensors/x")).into_notification(t0)];
        let candidate = spec("High temp", Some("sensors/x"));

        let just_inside = t0 + TimeDelta::seconds(30) - TimeDelta::milliseconds(1);
        assert!(guard.is_duplicate(&candidate, &stored, just_inside));

        let edge = t0 + TimeDelta::seconds(30);
        assert!(!guard.is_duplicate(&candidate, &stored, edge));
    }

    #[test]
    fn synthetic_notifications_dedupe_by_title() {
        let guard = DedupGuard::default();
        let t0 = Utc::now();
        let stored = vec![spec("Backup finished", None).into_notification(t0)];
        assert!(guard.is_duplicate(&spec("Backup finished", None), &stored, t0));
    }
}
