//! WebSocket telemetry feed with auto-reconnect.
//!
//! Connects to a publish/subscribe endpoint and streams parsed
//! [`RawEvent`]s through a [`tokio::sync::broadcast`] channel. Handles
//! reconnection with exponential backoff + jitter automatically.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulsewatch_feed::{FeedHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let feed = FeedHandle::connect("wss://telemetry.local/feed", ReconnectConfig::default(), cancel)?;
//! engine.attach_feed(feed.subscribe()).await;
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use pulsewatch_core::RawEvent;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::FeedError;
use crate::frame::parse_frame;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for feed reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── FeedHandle ───────────────────────────────────────────────────────

/// Handle to a running feed connection.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear down the background task.
pub struct FeedHandle {
    url: Url,
    event_rx: broadcast::Receiver<RawEvent>,
    cancel: CancellationToken,
}

impl FeedHandle {
    /// Validate the URL and spawn the reconnection loop.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Must be called from within a tokio runtime.
    pub fn connect(
        url: &str,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, FeedError> {
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(FeedError::UnsupportedScheme(url.scheme().to_owned()));
        }

        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_url = url.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            feed_loop(task_url, event_tx, reconnect, task_cancel).await;
        });

        Ok(Self {
            url,
            event_rx,
            cancel,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get a new broadcast receiver for the event stream.
    ///
    /// Multiple consumers can subscribe concurrently. If a consumer falls
    /// behind, it receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<RawEvent> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → backoff → reconnect.
///
/// Every disconnect, clean or not, waits out the backoff and counts toward
/// `max_retries`. The counter resets only after a session that delivered
/// at least one frame.
async fn feed_loop(
    url: Url,
    event_tx: broadcast::Sender<RawEvent>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let mut delivered = 0_usize;
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&url, &event_tx, &cancel, &mut delivered) => result,
        };
        if cancel.is_cancelled() {
            break;
        }
        if delivered > 0 {
            attempt = 0;
        }

        match outcome {
            Ok(()) => tracing::info!(delivered, "feed disconnected cleanly"),
            Err(e) => {
                tracing::warn!(error = %e, attempt, "feed connection error");
                if !e.is_transient() {
                    tracing::error!(error = %e, "feed error is not retryable, giving up");
                    break;
                }
            }
        }

        if reconnect.max_retries.is_some_and(|max| attempt >= max) {
            tracing::error!(
                max_retries = reconnect.max_retries,
                "feed reconnection limit reached, giving up"
            );
            break;
        }

        let delay = calculate_backoff(attempt, &reconnect);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    tracing::debug!("feed loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single connection and read frames until it drops, counting
/// text frames into `delivered`.
async fn connect_and_read(
    url: &Url,
    event_tx: &broadcast::Sender<RawEvent>,
    cancel: &CancellationToken,
    delivered: &mut usize,
) -> Result<(), FeedError> {
    tracing::info!(url = %url, "connecting to feed");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| FeedError::Connect(e.to_string()))?;

    tracing::info!("feed connected");

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        *delivered += 1;
                        parse_and_broadcast(&text, event_tx);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite answers pings itself
                        tracing::trace!("feed ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "feed close frame received"
                            );
                        } else {
                            tracing::info!("feed close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(FeedError::Connect(e.to_string()));
                    }
                    None => {
                        tracing::info!("feed stream ended");
                        return Ok(());
                    }
                    Some(Ok(_)) => {
                        // Binary, Pong, Frame
                    }
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse a text frame and broadcast any events found inside.
fn parse_and_broadcast(text: &str, event_tx: &broadcast::Sender<RawEvent>) {
    let events = match parse_frame(text) {
        Ok(events) => events,
        Err(e) => {
            tracing::debug!(error = %e, "dropping unparseable feed frame");
            return;
        }
    };

    for event in events {
        // No subscribers right now is not an error.
        let _ = event_tx.send(event);
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 ± 0.25)`
///
/// The jitter is deterministic in the attempt number.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
