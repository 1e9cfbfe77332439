// ── Filter predicates for notification snapshots ──
//
// Used by presentation layers to narrow a snapshot without another
// round-trip through the engine.

use crate::model::{Notification, Priority};

/// Filter predicate for notification collections.
pub enum NotificationFilter {
    All,
    Unread,
    ByCategory(String),
    MinPriority(Priority),
    Custom(Box<dyn Fn(&Notification) -> bool + Send + Sync>),
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        match self {
            Self::All => true,
            Self::Unread => !notification.read,
            Self::ByCategory(category) => notification.category == *category,
            Self::MinPriority(min) => notification.priority >= *min,
            Self::Custom(f) => f(notification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NotificationSpec;
    use chrono::Utc;

    #[test]
    fn predicates() {
        let mut n = NotificationSpec::system("t", "m").into_notification(Utc::now());
        n.priority = Priority::High;

        assert!(NotificationFilter::All.matches(&n));
        assert!(NotificationFilter::Unread.matches(&n));
        assert!(NotificationFilter::ByCategory("system".into()).matches(&n));
        assert!(!NotificationFilter::ByCategory("sensor".into()).matches(&n));
        assert!(NotificationFilter::MinPriority(Priority::Medium).matches(&n));
        assert!(!NotificationFilter::MinPriority(Priority::Critical).matches(&n));

        n.read = true;
        assert!(!NotificationFilter::Unread.matches(&n));
        let custom = NotificationFilter::Custom(Box::new(|n| n.title == "t"));
        assert!(custom.matches(&n));
    }
}
