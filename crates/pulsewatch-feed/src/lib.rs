// pulsewatch-feed: Event adapters that deliver raw telemetry to the engine.

pub mod error;
pub mod frame;
pub mod jsonl;
pub mod websocket;

pub use error::FeedError;
pub use frame::parse_frame;
pub use jsonl::JsonLinesReader;
pub use websocket::{FeedHandle, ReconnectConfig};
