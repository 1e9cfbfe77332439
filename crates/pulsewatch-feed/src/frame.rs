//! Feed frame parsing.
//!
//! A frame is one JSON object
//! `{"channel": "...", "payload": ..., "connectionId": "..."}` or an array
//! of them. `topic` is accepted in place of `channel`. String payloads are
//! passed through untouched; any other payload is re-serialized to JSON
//! text, since the engine always decodes from the raw string.

use pulsewatch_core::RawEvent;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FeedError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedFrame {
    #[serde(alias = "topic")]
    channel: String,

    #[serde(default)]
    payload: Option<Value>,

    #[serde(default, alias = "connection_id")]
    connection_id: Option<String>,
}

impl From<FeedFrame> for RawEvent {
    fn from(frame: FeedFrame) -> Self {
        let raw = match frame.payload {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Self {
            channel: frame.channel,
            raw_payload: raw,
            connection_id: frame.connection_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FrameBody {
    One(FeedFrame),
    Many(Vec<FeedFrame>),
}

/// Parse one text frame into the events it carries.
pub fn parse_frame(text: &str) -> Result<Vec<RawEvent>, FeedError> {
    let body: FrameBody = serde_json::from_str(text)?;
    Ok(match body {
        FrameBody::One(frame) => vec![frame.into()],
        FrameBody::Many(frames) => frames.into_iter().map(RawEvent::from).collect(),
    })
}
