#![allow(clippy::unwrap_used)]

// Engine behavior through the public handle: pipeline, lifecycle
// commands, expiry timing and side-effect delivery.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use pulsewatch_core::{
    AlertSink, Condition, CoreError, DeliveryError, Engine, EngineConfig, Notification,
    NotificationFilter, NotificationKind, NotificationSpec, NotificationTemplate, Operator,
    Priority, RawEvent, Rule, RulePatch, Settings,
};
use tokio::sync::broadcast;

fn template(title: &str, category: &str, expire: u64) -> NotificationTemplate {
    NotificationTemplate {
        kind: NotificationKind::Warning,
        title: title.into(),
        message: "value {value} on {topic}".into(),
        priority: Priority::High,
        category: category.into(),
        auto_expire_seconds: expire,
    }
}

fn index_rule(id: &str, threshold: i64, expire: u64) -> Rule {
    let title = format!("Index above {threshold}");
    Rule::new(id, title.clone(), template(&title, "sensor", expire)).with_condition(
        Condition::new(Operator::Gt)
            .value_key("Index")
            .threshold(threshold),
    )
}

fn start(rules: Vec<Rule>) -> Engine {
    Engine::start(EngineConfig::default().with_rules(rules)).unwrap()
}

fn event(channel: &str, payload: &str) -> RawEvent {
    RawEvent::new(channel, payload)
}

#[tokio::test]
async fn overlapping_rules_both_fire() {
    let engine = start(vec![index_rule("over-60", 60, 0), index_rule("over-40", 40, 0)]);

    let created = engine
        .ingest(event("sensors/index", r#"{"Index": 65}"#))
        .await
        .unwrap();

    assert_eq!(created.len(), 2);
    let titles: Vec<_> = engine
        .notifications_snapshot()
        .iter()
        .map(|n| n.title.clone())
        .collect();
    // Newest first: the second rule's notification was inserted last.
    assert_eq!(titles, ["Index above 40", "Index above 60"]);
    assert_eq!(created[0].message, "value 65 on sensors/index");

    let source = created[0].source.as_ref().unwrap();
    assert_eq!(source.channel, "sensors/index");
    assert_eq!(source.value, serde_json::json!({"Index": 65}));
    engine.shutdown().await;
}

#[tokio::test]
async fn disabled_rule_and_disabled_category_never_fire() {
    let engine = start(vec![index_rule("over-60", 60, 0)]);

    engine.set_rule_enabled("over-60", false).await.unwrap();
    let created = engine
        .ingest(event("sensors/index", r#"{"Index": 99}"#))
        .await
        .unwrap();
    assert!(created.is_empty());

    engine.set_rule_enabled("over-60", true).await.unwrap();
    engine.set_category_enabled("sensor", false).await.unwrap();
    let created = engine
        .ingest(event("sensors/index", r#"{"Index": 99}"#))
        .await
        .unwrap();
    assert!(created.is_empty());
    assert!(engine.notifications_snapshot().is_empty());
    engine.shutdown().await;
}

#[tokio::test]
async fn identical_alerts_within_window_are_stored_once() {
    let engine = start(vec![index_rule("over-60", 60, 0)]);

    for _ in 0..3 {
        engine
            .ingest(event("sensors/index", r#"{"Index": 70}"#))
            .await
            .unwrap();
    }
    engine
        .ingest(event("sensors/other", r#"{"Index": 70}"#))
        .await
        .unwrap();

    assert_eq!(engine.notifications_snapshot().len(), 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn raw_scalar_payload_fires_exists_rule() {
    let rule = Rule::new("any", "Anything", template("Reading", "sensor", 0))
        .with_condition(Condition::new(Operator::Exists));
    let engine = start(vec![rule]);

    let created = engine.ingest(event("sensors/raw", "42.5")).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].message, "value N/A on sensors/raw");
    assert_eq!(
        created[0].source.as_ref().unwrap().value,
        serde_json::json!({"rawPayload": "42.5"})
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn store_keeps_most_recent_up_to_capacity() {
    let settings = Settings {
        max_notifications: 3,
        ..Settings::default()
    };
    let engine = Engine::start(EngineConfig::default().with_settings(settings)).unwrap();

    for i in 0..5 {
        engine
            .add_notification(NotificationSpec::system(format!("n{i}"), "m"))
            .await
            .unwrap();
    }

    let titles: Vec<_> = engine
        .notifications_snapshot()
        .iter()
        .map(|n| n.title.clone())
        .collect();
    assert_eq!(titles, ["n4", "n3", "n2"]);

    engine.set_max_notifications(1).await.unwrap();
    assert_eq!(engine.notifications_snapshot().len(), 1);
    assert!(matches!(
        engine.set_max_notifications(0).await,
        Err(CoreError::ValidationFailed { .. })
    ));
    engine.shutdown().await;
}

#[tokio::test]
async fn synthetic_notifications_are_deduplicated() {
    let engine = start(Vec::new());

    let first = engine
        .add_notification(NotificationSpec::system("Backup done", "ok"))
        .await
        .unwrap();
    let second = engine
        .add_notification(NotificationSpec::system("Backup done", "ok"))
        .await
        .unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    engine.shutdown().await;
}

#[tokio::test]
async fn lifecycle_commands_update_counts() {
    let engine = start(Vec::new());
    let mut critical = NotificationSpec::system("Critical", "m");
    critical.priority = Priority::Critical;
    critical.category = "security".into();

    let a = engine.add_notification(critical).await.unwrap().unwrap();
    let b = engine
        .add_notification(NotificationSpec::system("Plain", "m"))
        .await
        .unwrap()
        .unwrap();

    let counts = engine.counts();
    assert_eq!(counts.unread, 2);
    assert_eq!(counts.critical_unread, 1);
    assert_eq!(counts.unread_in("security"), 1);

    engine.mark_as_read(a.id).await.unwrap();
    assert_eq!(engine.critical_unread_count(), 0);
    engine.mark_as_unread(a.id).await.unwrap();
    assert_eq!(engine.critical_unread_count(), 1);

    assert_eq!(engine.mark_all_as_read().await.unwrap().len(), 2);
    assert_eq!(engine.unread_count(), 0);

    assert_eq!(engine.clear_by_category("security").await.unwrap(), vec![a.id]);
    engine.delete_notification(b.id).await.unwrap();
    assert!(engine.notifications_snapshot().is_empty());

    assert!(matches!(
        engine.delete_notification(b.id).await,
        Err(CoreError::NotificationNotFound { .. })
    ));
    assert!(matches!(
        engine.mark_as_read(b.id).await,
        Err(CoreError::NotificationNotFound { .. })
    ));
    engine.shutdown().await;
}

#[tokio::test]
async fn rule_crud_through_engine() {
    let engine = start(vec![index_rule("over-60", 60, 0)]);

    let added = engine.add_rule(index_rule("over-90", 90, 0)).await.unwrap();
    assert_eq!(added.id, "over-90");
    assert!(matches!(
        engine.add_rule(index_rule("over-90", 90, 0)).await,
        Err(CoreError::DuplicateRule { .. })
    ));

    let renamed = engine
        .update_rule(
            "over-60",
            RulePatch {
                name: Some("Hot".into()),
                ..RulePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Hot");

    engine.delete_rule("over-90").await.unwrap();
    let ids: Vec<_> = engine
        .rules_snapshot()
        .iter()
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(ids, ["over-60"]);

    assert!(matches!(
        engine.delete_rule("over-90").await,
        Err(CoreError::RuleNotFound { .. })
    ));
    engine.shutdown().await;
}

#[tokio::test]
async fn invalid_startup_rules_are_rejected() {
    let empty = Rule::new("empty", "No conditions", template("t", "sensor", 0));
    let result = Engine::start(EngineConfig::default().with_rules([empty]));
    assert!(matches!(result, Err(CoreError::ValidationFailed { .. })));
}

// ── Expiry ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn zero_expiry_stays_unread() {
    let engine = start(vec![index_rule("over-60", 60, 0)]);
    engine
        .ingest(event("sensors/index", r#"{"Index": 70}"#))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
    assert!(!engine.notifications_snapshot()[0].read);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn notification_expires_after_delay() {
    let engine = start(vec![index_rule("over-60", 60, 5)]);
    let created = engine
        .ingest(event("sensors/index", r#"{"Index": 70}"#))
        .await
        .unwrap();
    let id = created[0].id;

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!is_read(&engine, id));

    tokio::time::sleep(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert!(is_read(&engine, id));
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn deleted_notification_is_not_revived_by_expiry() {
    let engine = start(vec![index_rule("over-60", 60, 5)]);
    let created = engine
        .ingest(event("sensors/index", r#"{"Index": 70}"#))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    engine.delete_notification(created[0].id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;
    assert!(engine.notifications_snapshot().is_empty());
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_read_cancels_pending_expiry() {
    let engine = start(vec![index_rule("over-60", 60, 5)]);
    let created = engine
        .ingest(event("sensors/index", r#"{"Index": 70}"#))
        .await
        .unwrap();
    let id = created[0].id;

    engine.mark_as_read(id).await.unwrap();
    engine.mark_as_unread(id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;
    assert!(!is_read(&engine, id), "cancelled timer must not re-read");
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn mark_all_as_read_cancels_pending_expiry() {
    let engine = start(vec![index_rule("over-60", 60, 5)]);
    let created = engine
        .ingest(event("sensors/index", r#"{"Index": 70}"#))
        .await
        .unwrap();
    let id = created[0].id;

    engine.mark_all_as_read().await.unwrap();
    engine.mark_as_unread(id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;
    assert!(!is_read(&engine, id));
    engine.shutdown().await;
}

fn is_read(engine: &Engine, id: uuid::Uuid) -> bool {
    engine
        .notifications_snapshot()
        .iter()
        .find(|n| n.id == id)
        .is_some_and(|n| n.read)
}

// ── Streams and fan-out ─────────────────────────────────────────────

#[tokio::test]
async fn created_broadcast_and_stream_follow_inserts() {
    let engine = start(vec![index_rule("over-60", 60, 0)]);
    let mut created_rx = engine.subscribe_created();
    let mut stream = engine.notifications();
    assert!(stream.current().is_empty());

    engine
        .ingest(event("sensors/index", r#"{"Index": 70}"#))
        .await
        .unwrap();

    let created = created_rx.recv().await.unwrap();
    assert_eq!(created.title, "Index above 60");
    let snapshot = stream.changed().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn notification_stream_yields_each_change() {
    let engine = start(vec![index_rule("over-60", 60, 0)]);
    let mut changes = engine.notifications().into_stream();
    assert!(changes.next().await.unwrap().is_empty());

    engine
        .ingest(event("sensors/index", r#"{"Index": 70}"#))
        .await
        .unwrap();
    let snapshot = changes.next().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(!snapshot[0].read);

    engine.mark_all_as_read().await.unwrap();
    assert!(changes.next().await.unwrap()[0].read);

    engine.shutdown().await;
}

#[tokio::test]
async fn filtered_view_selects_from_current_snapshot() {
    let engine = start(vec![index_rule("over-60", 60, 0)]);
    engine
        .ingest(event("sensors/index", r#"{"Index": 70}"#))
        .await
        .unwrap();
    let backup = engine
        .add_notification(NotificationSpec::system("Backup done", "ok"))
        .await
        .unwrap()
        .unwrap();
    engine.mark_as_read(backup.id).await.unwrap();

    let stream = engine.notifications();
    let sensor = stream.filtered(&NotificationFilter::ByCategory("sensor".into()));
    assert_eq!(sensor.len(), 1);
    assert_eq!(sensor[0].title, "Index above 60");

    let urgent = stream.filtered(&NotificationFilter::MinPriority(Priority::High));
    assert_eq!(urgent.len(), 1);

    let unread = stream.filtered(&NotificationFilter::Unread);
    assert_eq!(unread.len(), 1);
    assert_eq!(stream.filtered(&NotificationFilter::All).len(), 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn settings_watch_follows_updates() {
    let engine = start(Vec::new());
    let mut settings = engine.settings_watch();
    assert!(!settings.has_changed().unwrap());

    engine.set_max_notifications(5).await.unwrap();
    assert!(settings.has_changed().unwrap());
    assert_eq!(settings.borrow_and_update().max_notifications, 5);

    engine.set_sound_enabled(false).await.unwrap();
    settings.changed().await.unwrap();
    assert!(!settings.borrow().sound_enabled);
    engine.shutdown().await;
}

#[tokio::test]
async fn attached_feed_is_forwarded() {
    let engine = start(vec![index_rule("over-60", 60, 0)]);
    let (feed_tx, feed_rx) = broadcast::channel(16);
    engine.attach_feed(feed_rx).await;
    let mut created_rx = engine.subscribe_created();

    feed_tx
        .send(event("sensors/index", r#"{"Index": 61}"#))
        .unwrap();

    let created = created_rx.recv().await.unwrap();
    assert_eq!(created.channel(), Some("sensors/index"));
    engine.shutdown().await;
}

#[tokio::test]
async fn commands_fail_after_shutdown() {
    let engine = start(Vec::new());
    engine.shutdown().await;
    assert!(!engine.is_running());
    assert!(matches!(
        engine.clear_all().await,
        Err(CoreError::EngineStopped)
    ));
}

// ── Delivery ────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSink {
    desktop_result: Option<DeliveryError>,
    desktop: Mutex<Vec<String>>,
    sounds: Mutex<Vec<String>>,
}

impl AlertSink for RecordingSink {
    fn show_desktop(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.desktop.lock().unwrap().push(notification.title.clone());
        match &self.desktop_result {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn play_sound(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.sounds.lock().unwrap().push(notification.title.clone());
        Ok(())
    }
}

#[tokio::test]
async fn sound_only_for_high_priority() {
    let sink = Arc::new(RecordingSink::default());
    let engine = Engine::start(EngineConfig::default().with_sink(sink.clone())).unwrap();

    let mut loud = NotificationSpec::system("Loud", "m");
    loud.priority = Priority::High;
    engine.add_notification(loud).await.unwrap();
    engine
        .add_notification(NotificationSpec::system("Quiet", "m"))
        .await
        .unwrap();

    assert_eq!(*sink.sounds.lock().unwrap(), ["Loud"]);
    assert!(sink.desktop.lock().unwrap().is_empty(), "desktop is off by default");

    engine.set_sound_enabled(false).await.unwrap();
    let mut loud_again = NotificationSpec::system("Loud again", "m");
    loud_again.priority = Priority::Critical;
    engine.add_notification(loud_again).await.unwrap();
    assert_eq!(sink.sounds.lock().unwrap().len(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn denied_desktop_delivery_turns_setting_off() {
    let sink = Arc::new(RecordingSink {
        desktop_result: Some(DeliveryError::PermissionDenied),
        ..RecordingSink::default()
    });
    let settings = Settings {
        desktop_notifications_enabled: true,
        ..Settings::default()
    };
    let engine = Engine::start(
        EngineConfig::default()
            .with_settings(settings)
            .with_sink(sink.clone()),
    )
    .unwrap();

    let created = engine
        .add_notification(NotificationSpec::system("First", "m"))
        .await
        .unwrap();
    assert!(created.is_some(), "in-app notification still stored");
    assert!(!engine.settings().desktop_notifications_enabled);

    engine
        .add_notification(NotificationSpec::system("Second", "m"))
        .await
        .unwrap();
    assert_eq!(*sink.desktop.lock().unwrap(), ["First"]);
    engine.shutdown().await;
}
