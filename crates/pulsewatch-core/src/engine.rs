// ── Notification engine ──
//
// Single-owner actor that holds the rule registry, settings, notification
// store and expiry timers. Feed events, presentation commands and timer
// expiries all arrive as messages and are applied strictly one at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::decode::DecodedPayload;
use crate::dedup::{DEDUP_WINDOW, DedupGuard};
use crate::error::CoreError;
use crate::evaluate::{EvaluationContext, evaluate};
use crate::expiry::{ExpiryScheduler, ExpiryTicket};
use crate::model::{
    Notification, NotificationSpec, RawEvent, Rule, RulePatch, SettingChange, Settings,
};
use crate::registry::{RuleRegistry, RuleSnapshot};
use crate::sink::{AlertSink, NullSink};
use crate::store::{NotificationCounts, NotificationSnapshot, NotificationStore};
use crate::stream::{NotificationStream, RuleStream};

const COMMAND_CHANNEL_SIZE: usize = 256;
const EXPIRY_CHANNEL_SIZE: usize = 64;
const CREATED_CHANNEL_SIZE: usize = 256;

// ── EngineConfig ─────────────────────────────────────────────────

/// Startup parameters for an [`Engine`].
pub struct EngineConfig {
    pub settings: Settings,
    /// Initial rule set, in evaluation order.
    pub rules: Vec<Rule>,
    pub dedup_window: Duration,
    pub sink: Arc<dyn AlertSink>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            rules: Vec::new(),
            dedup_window: DEDUP_WINDOW,
            sink: Arc::new(NullSink),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = sink;
        self
    }
}

// ── Engine ───────────────────────────────────────────────────────

/// Handle to a running notification engine.
///
/// Cheaply cloneable via `Arc<EngineInner>`. All clones talk to the same
/// engine task; state is observed through snapshots and streams.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    command_tx: mpsc::Sender<CommandEnvelope>,
    notifications: watch::Receiver<NotificationSnapshot>,
    rules: watch::Receiver<RuleSnapshot>,
    settings: watch::Receiver<Settings>,
    created_tx: broadcast::Sender<Arc<Notification>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Validate the configuration and spawn the engine task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: EngineConfig) -> Result<Self, CoreError> {
        config.settings.validate()?;
        let registry = RuleRegistry::with_rules(config.rules)?;
        let store = NotificationStore::new(config.settings.max_notifications);

        let cancel = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (expiry_tx, expiry_rx) = mpsc::channel(EXPIRY_CHANNEL_SIZE);
        let (created_tx, _) = broadcast::channel(CREATED_CHANNEL_SIZE);
        let (settings_tx, settings_rx) = watch::channel(config.settings.clone());

        let notifications = store.subscribe();
        let rules = registry.subscribe();

        info!(
            rules = registry.len(),
            max_notifications = config.settings.max_notifications,
            "notification engine starting"
        );

        let state = EngineState {
            registry,
            settings: config.settings,
            settings_tx,
            store,
            expiry: ExpiryScheduler::new(expiry_tx, cancel.child_token()),
            dedup: DedupGuard::new(config.dedup_window),
            sink: config.sink,
            created_tx: created_tx.clone(),
        };

        let handle = tokio::spawn(engine_task(state, command_rx, expiry_rx, cancel.clone()));

        Ok(Self {
            inner: Arc::new(EngineInner {
                command_tx,
                notifications,
                rules,
                settings: settings_rx,
                created_tx,
                cancel,
                task_handles: Mutex::new(vec![handle]),
            }),
        })
    }

    /// Stop the engine and every task attached to it.
    ///
    /// Pending expiry timers are cancelled. Commands issued afterwards fail
    /// with [`CoreError::EngineStopped`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("notification engine shut down");
    }

    pub fn is_running(&self) -> bool {
        !self.inner.cancel.is_cancelled() && !self.inner.command_tx.is_closed()
    }

    /// Token cancelled when the engine shuts down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    // ── Command execution ────────────────────────────────────────

    /// Send a command to the engine task and await its result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::EngineStopped);
        }

        let (tx, rx) = oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::EngineStopped)?;

        rx.await.map_err(|_| CoreError::EngineStopped)?
    }

    /// Run one raw event through the pipeline. Returns the notifications
    /// it produced (possibly none).
    pub async fn ingest(&self, event: RawEvent) -> Result<Vec<Arc<Notification>>, CoreError> {
        match self.execute(Command::Ingest(event)).await? {
            CommandResult::Created(list) => Ok(list),
            other => Err(unexpected(&other)),
        }
    }

    /// Forward every event from a feed broadcast into the engine until the
    /// feed closes or the engine shuts down.
    pub async fn attach_feed(&self, mut feed: broadcast::Receiver<RawEvent>) {
        let engine = self.clone();
        let cancel = self.inner.cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    received = feed.recv() => match received {
                        Ok(event) => {
                            if let Err(e) = engine.ingest(event).await {
                                debug!(error = %e, "feed forwarding stopped");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "engine fell behind the feed; events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("feed closed");
                            break;
                        }
                    },
                }
            }
        });

        self.inner.task_handles.lock().await.push(handle);
    }

    // ── Notification commands ────────────────────────────────────

    /// Store a synthetic notification. Returns `None` when it was
    /// suppressed as a duplicate.
    pub async fn add_notification(
        &self,
        spec: NotificationSpec,
    ) -> Result<Option<Arc<Notification>>, CoreError> {
        match self.execute(Command::AddNotification(spec)).await? {
            CommandResult::Created(mut list) => Ok(list.pop()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn mark_as_read(&self, id: Uuid) -> Result<(), CoreError> {
        self.execute(Command::MarkAsRead { id }).await.map(drop)
    }

    pub async fn mark_as_unread(&self, id: Uuid) -> Result<(), CoreError> {
        self.execute(Command::MarkAsUnread { id }).await.map(drop)
    }

    pub async fn delete_notification(&self, id: Uuid) -> Result<(), CoreError> {
        self.execute(Command::DeleteNotification { id })
            .await
            .map(drop)
    }

    pub async fn clear_all(&self) -> Result<Vec<Uuid>, CoreError> {
        affected(self.execute(Command::ClearAll).await?)
    }

    pub async fn clear_by_category(&self, category: impl Into<String>) -> Result<Vec<Uuid>, CoreError> {
        affected(
            self.execute(Command::ClearByCategory {
                category: category.into(),
            })
            .await?,
        )
    }

    pub async fn mark_all_as_read(&self) -> Result<Vec<Uuid>, CoreError> {
        affected(self.execute(Command::MarkAllAsRead).await?)
    }

    // ── Rule commands ────────────────────────────────────────────

    pub async fn add_rule(&self, rule: Rule) -> Result<Arc<Rule>, CoreError> {
        rule_result(self.execute(Command::AddRule(rule)).await?)
    }

    pub async fn update_rule(
        &self,
        id: impl Into<String>,
        patch: RulePatch,
    ) -> Result<Arc<Rule>, CoreError> {
        rule_result(
            self.execute(Command::UpdateRule {
                id: id.into(),
                patch,
            })
            .await?,
        )
    }

    pub async fn delete_rule(&self, id: impl Into<String>) -> Result<Arc<Rule>, CoreError> {
        rule_result(self.execute(Command::DeleteRule { id: id.into() }).await?)
    }

    pub async fn set_rule_enabled(
        &self,
        id: impl Into<String>,
        enabled: bool,
    ) -> Result<Arc<Rule>, CoreError> {
        rule_result(
            self.execute(Command::SetRuleEnabled {
                id: id.into(),
                enabled,
            })
            .await?,
        )
    }

    // ── Settings commands ────────────────────────────────────────

    pub async fn update_settings(&self, change: SettingChange) -> Result<Settings, CoreError> {
        match self.execute(Command::UpdateSettings(change)).await? {
            CommandResult::Settings(settings) => Ok(settings),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn set_sound_enabled(&self, on: bool) -> Result<Settings, CoreError> {
        self.update_settings(SettingChange::Sound(on)).await
    }

    pub async fn set_desktop_notifications_enabled(&self, on: bool) -> Result<Settings, CoreError> {
        self.update_settings(SettingChange::DesktopNotifications(on))
            .await
    }

    pub async fn set_max_notifications(&self, max: usize) -> Result<Settings, CoreError> {
        self.update_settings(SettingChange::MaxNotifications(max))
            .await
    }

    pub async fn set_category_enabled(
        &self,
        category: impl Into<String>,
        enabled: bool,
    ) -> Result<Settings, CoreError> {
        self.update_settings(SettingChange::Category {
            category: category.into(),
            enabled,
        })
        .await
    }

    // ── State observation ────────────────────────────────────────

    pub fn notifications(&self) -> NotificationStream {
        NotificationStream::new(self.inner.notifications.clone())
    }

    pub fn notifications_snapshot(&self) -> NotificationSnapshot {
        self.inner.notifications.borrow().clone()
    }

    pub fn rules(&self) -> RuleStream {
        RuleStream::new(self.inner.rules.clone())
    }

    pub fn rules_snapshot(&self) -> RuleSnapshot {
        self.inner.rules.borrow().clone()
    }

    pub fn settings(&self) -> Settings {
        self.inner.settings.borrow().clone()
    }

    /// Subscribe to settings changes.
    pub fn settings_watch(&self) -> watch::Receiver<Settings> {
        self.inner.settings.clone()
    }

    /// Subscribe to notifications as they are stored.
    pub fn subscribe_created(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.inner.created_tx.subscribe()
    }

    pub fn counts(&self) -> NotificationCounts {
        let snapshot = self.notifications_snapshot();
        NotificationCounts::from_notifications(snapshot.iter().map(Arc::as_ref))
    }

    pub fn unread_count(&self) -> usize {
        self.counts().unread
    }

    pub fn critical_unread_count(&self) -> usize {
        self.counts().critical_unread
    }
}

fn unexpected(result: &CommandResult) -> CoreError {
    CoreError::Internal(format!("unexpected command result: {result:?}"))
}

fn affected(result: CommandResult) -> Result<Vec<Uuid>, CoreError> {
    match result {
        CommandResult::Affected(ids) => Ok(ids),
        other => Err(unexpected(&other)),
    }
}

fn rule_result(result: CommandResult) -> Result<Arc<Rule>, CoreError> {
    match result {
        CommandResult::Rule(rule) => Ok(rule),
        other => Err(unexpected(&other)),
    }
}

// ── Engine task ──────────────────────────────────────────────────

async fn engine_task(
    mut state: EngineState,
    mut command_rx: mpsc::Receiver<CommandEnvelope>,
    mut expiry_rx: mpsc::Receiver<ExpiryTicket>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(ticket) = expiry_rx.recv() => state.expire(ticket),
            envelope = command_rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = state.apply(envelope.command);
                let _ = envelope.response_tx.send(result);
            }
        }
    }

    state.expiry.cancel_all();
    debug!("engine task exited");
}

/// Everything the engine task owns.
struct EngineState {
    registry: RuleRegistry,
    settings: Settings,
    settings_tx: watch::Sender<Settings>,
    store: NotificationStore,
    expiry: ExpiryScheduler,
    dedup: DedupGuard,
    sink: Arc<dyn AlertSink>,
    created_tx: broadcast::Sender<Arc<Notification>>,
}

impl EngineState {
    fn apply(&mut self, command: Command) -> Result<CommandResult, CoreError> {
        match command {
            Command::Ingest(event) => Ok(CommandResult::Created(self.ingest(&event))),
            Command::AddNotification(spec) => {
                let created = self.admit(spec, Utc::now());
                Ok(CommandResult::Created(created.into_iter().collect()))
            }

            Command::MarkAsRead { id } => {
                self.require(id)?;
                self.expiry.cancel(id);
                self.store.mark_read(id);
                Ok(CommandResult::Ok)
            }
            Command::MarkAsUnread { id } => {
                self.require(id)?;
                self.store.mark_unread(id);
                Ok(CommandResult::Ok)
            }
            Command::DeleteNotification { id } => {
                self.expiry.cancel(id);
                self.store
                    .delete(id)
                    .ok_or(CoreError::NotificationNotFound { id })?;
                Ok(CommandResult::Ok)
            }
            Command::ClearAll => {
                let removed = self.store.clear_all();
                self.expiry.cancel_all();
                Ok(CommandResult::Affected(removed))
            }
            Command::ClearByCategory { category } => {
                let removed = self.store.clear_by_category(&category);
                self.expiry.cancel_many(removed.iter().copied());
                Ok(CommandResult::Affected(removed))
            }
            Command::MarkAllAsRead => {
                let changed = self.store.mark_all_read();
                self.expiry.cancel_all();
                Ok(CommandResult::Affected(changed))
            }

            Command::AddRule(rule) => {
                let id = rule.id.clone();
                self.registry.add(rule)?;
                self.registry
                    .get(&id)
                    .map(CommandResult::Rule)
                    .ok_or(CoreError::RuleNotFound { id })
            }
            Command::UpdateRule { id, patch } => {
                self.registry.update(&id, patch).map(CommandResult::Rule)
            }
            Command::DeleteRule { id } => self.registry.delete(&id).map(CommandResult::Rule),
            Command::SetRuleEnabled { id, enabled } => self
                .registry
                .set_enabled(&id, enabled)
                .map(CommandResult::Rule),

            Command::UpdateSettings(change) => {
                let resize = matches!(change, SettingChange::MaxNotifications(_));
                self.settings.apply(change)?;
                if resize {
                    let evicted = self.store.set_capacity(self.settings.max_notifications);
                    self.expiry.cancel_many(evicted);
                }
                self.publish_settings();
                Ok(CommandResult::Settings(self.settings.clone()))
            }
        }
    }

    /// decode → evaluate → dedup → store → schedule, for one event.
    fn ingest(&mut self, event: &RawEvent) -> Vec<Arc<Notification>> {
        let now = Utc::now();
        let payload = DecodedPayload::decode(&event.raw_payload);
        let ctx = EvaluationContext::new(event, &payload, now);

        let candidates = evaluate(self.registry.iter(), &self.settings, &ctx);
        candidates
            .into_iter()
            .filter_map(|spec| self.admit(spec, now))
            .collect()
    }

    /// Dedup, store, arm the expiry timer, then fan out.
    fn admit(&mut self, spec: NotificationSpec, now: DateTime<Utc>) -> Option<Arc<Notification>> {
        if self.dedup.is_duplicate(&spec, self.store.iter(), now) {
            debug!(title = %spec.title, channel = ?spec.channel(), "duplicate suppressed");
            return None;
        }

        let notification = spec.into_notification(now);
        let id = notification.id;
        let expire_after = Duration::from_secs(notification.auto_expire_seconds);

        let evicted = self.store.insert(notification);
        self.expiry.cancel_many(evicted);
        self.expiry.schedule(id, expire_after);

        let stored = self.store.get(id)?;
        debug!(%id, title = %stored.title, priority = %stored.priority, "notification stored");

        let _ = self.created_tx.send(Arc::clone(&stored));
        self.deliver(&stored);
        Some(stored)
    }

    fn deliver(&mut self, notification: &Notification) {
        if self.settings.desktop_notifications_enabled {
            if let Err(e) = self.sink.show_desktop(notification) {
                if e.is_permanent() {
                    debug!(error = %e, "desktop notifications unavailable; disabling");
                    self.settings.desktop_notifications_enabled = false;
                    self.publish_settings();
                } else {
                    debug!(error = %e, "desktop notification failed");
                }
            }
        }

        if self.settings.sound_enabled && notification.priority.is_audible() {
            if let Err(e) = self.sink.play_sound(notification) {
                debug!(error = %e, "alert sound failed");
            }
        }
    }

    fn expire(&mut self, ticket: ExpiryTicket) {
        if self.expiry.complete(ticket) && self.store.mark_read(ticket.id) {
            debug!(id = %ticket.id, "notification auto-expired");
        }
    }

    fn require(&self, id: Uuid) -> Result<(), CoreError> {
        if self.store.get(id).is_some() {
            Ok(())
        } else {
            Err(CoreError::NotificationNotFound { id })
        }
    }

    fn publish_settings(&self) {
        self.settings_tx.send_replace(self.settings.clone());
    }
}
