//! One-shot evaluation of a single event against the configured rules.

use std::sync::Arc;

use pulsewatch_core::{Notification, RawEvent};
use tabled::Tabled;

use crate::cli::{EvalArgs, GlobalOpts};
use crate::config::{self, Presentation};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

impl NotificationRow {
    fn new(n: &Notification, color: bool) -> Self {
        Self {
            priority: output::paint_priority(n.priority, color),
            kind: n.kind.to_string(),
            category: n.category.clone(),
            title: n.title.clone(),
            message: n.message.clone(),
            expires: match n.auto_expire_seconds {
                0 => "never".into(),
                secs => format!("{secs}s"),
            },
        }
    }
}

pub async fn handle(args: EvalArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let view = Presentation::resolve(global, &cfg);

    let mut event = RawEvent::new(args.channel, args.payload);
    if let Some(connection_id) = args.connection_id {
        event = event.with_connection(connection_id);
    }

    let engine = super::start_engine(&cfg)?;
    let result = engine.ingest(event).await;
    engine.shutdown().await;
    let created: Vec<Arc<Notification>> = result?;

    tracing::info!(count = created.len(), "evaluation complete");

    let out = output::render_list(
        &view.format,
        &created,
        |n| NotificationRow::new(n, view.color),
        |n| n.id.to_string(),
    )?;
    output::print_output(&out, view.quiet);
    Ok(())
}
