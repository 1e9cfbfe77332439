// ── Notification storage ──
//
// Bounded newest-first collection with push-based change notification.

mod counts;
mod notification_store;

pub use counts::NotificationCounts;
pub use notification_store::{NotificationSnapshot, NotificationStore};
