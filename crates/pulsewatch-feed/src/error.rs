use thiserror::Error;

/// Top-level error type for the `pulsewatch-feed` crate.
#[derive(Debug, Error)]
pub enum FeedError {
    // ── Addressing ──────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Feed URL uses something other than `ws://` or `wss://`.
    #[error("Unsupported feed scheme '{0}' (expected ws or wss)")]
    UnsupportedScheme(String),

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    Connect(String),

    // ── Frames ──────────────────────────────────────────────────────
    /// A frame was not valid feed JSON.
    #[error("Malformed feed frame: {0}")]
    Frame(#[from] serde_json::Error),

    /// A JSON-lines input line could not be parsed.
    #[error("Malformed event on line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<FeedError>,
    },

    // ── Local input ─────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// Returns `true` if reconnecting might resolve this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Io(_))
    }
}
