//! Continuous evaluation: a live WebSocket feed or a recorded capture.
//!
//! Events go through the engine one at a time; each notification the
//! engine stores is printed as a single line as soon as it is created.

use std::path::Path;
use std::sync::Arc;

use pulsewatch_config::Config;
use pulsewatch_core::{Engine, Notification, NotificationCounts, NotificationFilter, RawEvent};
use pulsewatch_feed::{FeedHandle, JsonLinesReader};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::broadcast;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::{self, Presentation};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let view = Presentation::resolve(global, &cfg);
    let printer = Printer::new(&args, view);

    let engine = super::start_engine(&cfg)?;
    let result = match &args.replay {
        Some(path) => replay(&engine, path, &printer).await,
        None => live(&engine, &args, &cfg, &printer).await,
    };

    let counts = engine.counts();
    engine.shutdown().await;
    result?;

    if args.summary {
        printer.summary(&counts)?;
    }
    Ok(())
}

// ── Sources ─────────────────────────────────────────────────────────

async fn replay(engine: &Engine, path: &Path, printer: &Printer) -> Result<(), CliError> {
    if path.as_os_str() == "-" {
        let stdin = BufReader::new(tokio::io::stdin());
        return replay_from(engine, stdin, printer).await;
    }

    let file = tokio::fs::File::open(path).await?;
    replay_from(engine, BufReader::new(file), printer).await
}

async fn replay_from<R>(engine: &Engine, reader: R, printer: &Printer) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut events = JsonLinesReader::new(reader);
    let mut ingested = 0_usize;

    while let Some(event) = events.next_event().await? {
        ingest_and_print(engine, event, printer).await?;
        ingested += 1;
    }

    tracing::info!(ingested, skipped = events.skipped(), "replay finished");
    Ok(())
}

async fn live(
    engine: &Engine,
    args: &WatchArgs,
    cfg: &Config,
    printer: &Printer,
) -> Result<(), CliError> {
    let url = args
        .url
        .clone()
        .or_else(|| cfg.feed.url.clone())
        .ok_or(CliError::NoFeed)?;

    let cancel = engine.cancellation_token().child_token();
    let feed = FeedHandle::connect(&url, cfg.feed.reconnect_config(), cancel)?;
    let mut events = feed.subscribe();
    tracing::info!(url = %feed.url(), "watching feed");

    let result = loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break Ok(());
            }
            received = events.recv() => match received {
                Ok(event) => {
                    if let Err(e) = ingest_and_print(engine, event, printer).await {
                        break Err(e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "fell behind the feed; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break Err(CliError::FeedClosed { url: url.clone() });
                }
            },
        }
    };

    feed.shutdown();
    result
}

async fn ingest_and_print(
    engine: &Engine,
    event: RawEvent,
    printer: &Printer,
) -> Result<(), CliError> {
    for notification in engine.ingest(event).await? {
        printer.print(&notification)?;
    }
    Ok(())
}

// ── Output ──────────────────────────────────────────────────────────

struct Printer {
    filters: Vec<NotificationFilter>,
    view: Presentation,
}

impl Printer {
    fn new(args: &WatchArgs, view: Presentation) -> Self {
        let mut filters = Vec::new();
        if let Some(min) = args.min_priority {
            filters.push(NotificationFilter::MinPriority(min));
        }
        if let Some(category) = &args.category {
            filters.push(NotificationFilter::ByCategory(category.clone()));
        }
        Self { filters, view }
    }

    fn print(&self, notification: &Arc<Notification>) -> Result<(), CliError> {
        if !self.filters.iter().all(|f| f.matches(notification)) {
            return Ok(());
        }
        let line =
            output::render_notification_line(&self.view.format, notification, self.view.color)?;
        output::print_output(&line, self.view.quiet);
        Ok(())
    }

    fn summary(&self, counts: &NotificationCounts) -> Result<(), CliError> {
        let out = match self.view.format {
            OutputFormat::Table | OutputFormat::Plain => {
                let mut lines = vec![format!(
                    "{} notification(s), {} unread, {} critical unread",
                    counts.total, counts.unread, counts.critical_unread
                )];
                for (category, unread) in &counts.unread_by_category {
                    lines.push(format!("  {category}: {unread} unread"));
                }
                lines.join("\n")
            }
            _ => output::render_single(
                &self.view.format,
                counts,
                |_| String::new(),
                |_| String::new(),
            )?,
        };
        output::print_output(&out, self.view.quiet);
        Ok(())
    }
}
