// ── Auto-expire timers ──
//
// One-shot timers that mark a notification read after its template's
// `auto_expire_seconds`. Timers never touch the store themselves: on
// firing they send an `ExpiryTicket` back to the engine task, which
// honors it only if that exact timer is still registered.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use uuid::Uuid;

/// Message sent by a fired timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryTicket {
    pub id: Uuid,
    generation: u64,
}

struct Timer {
    generation: u64,
    cancel: CancellationToken,
}

/// Registry of live expiry timers, at most one per notification.
pub struct ExpiryScheduler {
    timers: HashMap<Uuid, Timer>,
    next_generation: u64,
    fired_tx: mpsc::Sender<ExpiryTicket>,
    /// Parent of every timer token; cancelling it stops all timers.
    root: CancellationToken,
}

impl ExpiryScheduler {
    pub fn new(fired_tx: mpsc::Sender<ExpiryTicket>, root: CancellationToken) -> Self {
        Self {
            timers: HashMap::new(),
            next_generation: 0,
            fired_tx,
            root,
        }
    }

    /// Arm a timer for `id`. A zero delay schedules nothing. Re-arming an
    /// id cancels its previous timer first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, id: Uuid, after: Duration) {
        if after.is_zero() {
            return;
        }
        self.cancel(id);

        let generation = self.next_generation;
        self.next_generation += 1;

        let cancel = self.root.child_token();
        let task_cancel = cancel.clone();
        let tx = self.fired_tx.clone();
        let ticket = ExpiryTicket { id, generation };

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = task_cancel.cancelled() => {}
                () = tokio::time::sleep(after) => {
                    // Engine gone means nothing left to expire.
                    let _ = tx.send(ticket).await;
                }
            }
        });

        trace!(%id, delay_secs = after.as_secs(), "expiry timer armed");
        self.timers.insert(id, Timer { generation, cancel });
    }

    /// Cancel the timer for `id`. Returns `true` if one was live.
    ///
    /// Safe to call for ids whose timer already fired or was never armed.
    pub fn cancel(&mut self, id: Uuid) -> bool {
        match self.timers.remove(&id) {
            Some(timer) => {
                timer.cancel.cancel();
                trace!(%id, "expiry timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_many(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        for id in ids {
            self.cancel(id);
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.cancel.cancel();
        }
    }

    /// Consume a fired ticket. Returns `true` only if it belongs to the
    /// currently registered timer for its id; stale tickets are ignored.
    pub fn complete(&mut self, ticket: ExpiryTicket) -> bool {
        match self.timers.get(&ticket.id) {
            Some(timer) if timer.generation == ticket.generation => {
                self.timers.remove(&ticket.id);
                true
            }
            _ => false,
        }
    }

    pub fn is_scheduled(&self, id: Uuid) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scheduler() -> (ExpiryScheduler, mpsc::Receiver<ExpiryTicket>) {
        let (tx, rx) = mpsc::channel(16);
        (ExpiryScheduler::new(tx, CancellationToken::new()), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (mut sched, mut rx) = scheduler();
        let id = Uuid::new_v4();
        sched.schedule(id, Duration::from_secs(5));
        assert!(sched.is_scheduled(id));

        let ticket = rx.recv().await.unwrap();
        assert_eq!(ticket.id, id);
        assert!(sched.complete(ticket));
        assert!(!sched.is_scheduled(id));
        assert!(!sched.complete(ticket), "a ticket completes once");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_never_schedules() {
        let (mut sched, mut rx) = scheduler();
        sched.schedule(Uuid::new_v4(), Duration::ZERO);
        assert_eq!(sched.pending(), 0);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (mut sched, mut rx) = scheduler();
        let id = Uuid::new_v4();
        sched.schedule(id, Duration::from_secs(5));

        assert!(sched.cancel(id));
        assert!(!sched.cancel(id), "cancel is idempotent");
        assert!(!sched.cancel(Uuid::new_v4()), "never-armed id is a no-op");

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_invalidates_previous_ticket() {
        let (mut sched, mut rx) = scheduler();
        let id = Uuid::new_v4();
        sched.schedule(id, Duration::from_secs(1));
        sched.schedule(id, Duration::from_secs(5));
        assert_eq!(sched.pending(), 1);

        let ticket = rx.recv().await.unwrap();
        assert!(sched.complete(ticket));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn root_cancellation_stops_everything() {
        let (tx, mut rx) = mpsc::channel(16);
        let root = CancellationToken::new();
        let mut sched = ExpiryScheduler::new(tx, root.clone());
        sched.schedule(Uuid::new_v4(), Duration::from_secs(1));
        sched.schedule(Uuid::new_v4(), Duration::from_secs(2));

        root.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
