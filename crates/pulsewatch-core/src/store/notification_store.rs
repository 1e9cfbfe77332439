// ── Bounded notification collection ──
//
// Newest-first storage with a hard size bound and push-based change
// notification via a `watch` channel. Owned by the engine task, so
// mutation needs `&mut self` and no interior locking.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use super::counts::NotificationCounts;
use crate::model::Notification;

/// Immutable point-in-time view of the store, newest first.
pub type NotificationSnapshot = Arc<Vec<Arc<Notification>>>;

/// The live notification list.
///
/// Every mutation rebuilds the snapshot that subscribers receive. Removal methods return the affected ids so the
/// caller can cancel their expiry timers.
pub struct NotificationStore {
    /// Front is newest.
    entries: VecDeque<Arc<Notification>>,

    /// Upper bound on `entries.len()`.
    capacity: usize,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<NotificationSnapshot>,
}

impl NotificationStore {
    /// A store holding at most `capacity` notifications (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            snapshot,
        }
    }

    /// Prepend a notification, evicting the oldest entries beyond capacity.
    /// Returns the ids of evicted notifications.
    pub fn insert(&mut self, notification: Notification) -> Vec<Uuid> {
        self.entries.push_front(Arc::new(notification));
        let evicted = self.truncate();
        self.publish();
        evicted
    }

    /// Mark one notification read. Returns `true` if it was unread.
    pub fn mark_read(&mut self, id: Uuid) -> bool {
        self.set_read(id, true)
    }

    /// Mark one notification unread. Returns `true` if it was read.
    pub fn mark_unread(&mut self, id: Uuid) -> bool {
        self.set_read(id, false)
    }

    /// Mark every notification read. Returns the ids that changed.
    pub fn mark_all_read(&mut self) -> Vec<Uuid> {
        let mut changed = Vec::new();
        for entry in &mut self.entries {
            if !entry.read {
                Arc::make_mut(entry).read = true;
                changed.push(entry.id);
            }
        }
        if !changed.is_empty() {
            self.publish();
        }
        changed
    }

    /// Remove one notification. Returns it if it existed.
    pub fn delete(&mut self, id: Uuid) -> Option<Arc<Notification>> {
        let pos = self.entries.iter().position(|n| n.id == id)?;
        let removed = self.entries.remove(pos);
        self.publish();
        removed
    }

    /// Remove everything. Returns the removed ids.
    pub fn clear_all(&mut self) -> Vec<Uuid> {
        let removed: Vec<Uuid> = self.entries.drain(..).map(|n| n.id).collect();
        if !removed.is_empty() {
            self.publish();
        }
        removed
    }

    /// Remove every notification in `category`. Returns the removed ids.
    pub fn clear_by_category(&mut self, category: &str) -> Vec<Uuid> {
        let mut removed = Vec::new();
        self.entries.retain(|n| {
            if n.category == category {
                removed.push(n.id);
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.publish();
        }
        removed
    }

    /// Change the size bound, evicting the oldest entries if it shrank.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<Uuid> {
        self.capacity = capacity.max(1);
        let evicted = self.truncate();
        if !evicted.is_empty() {
            self.publish();
        }
        evicted
    }

    // ── Read access ─────────────────────────────────────────────────

    pub fn get(&self, id: Uuid) -> Option<Arc<Notification>> {
        self.entries.iter().find(|n| n.id == id).cloned()
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn counts(&self) -> NotificationCounts {
        NotificationCounts::from_notifications(self.iter())
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> NotificationSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.snapshot.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn set_read(&mut self, id: Uuid, read: bool) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if entry.read == read {
            return false;
        }
        Arc::make_mut(entry).read = read;
        self.publish();
        true
    }

    fn truncate(&mut self) -> Vec<Uuid> {
        if self.entries.len() <= self.capacity {
            return Vec::new();
        }
        self.entries
            .drain(self.capacity..)
            .map(|n| n.id)
            .collect()
    }

    /// Rebuild the snapshot and broadcast it.
    fn publish(&mut self) {
        let values: Vec<Arc<Notification>> = self.entries.iter().cloned().collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
