// ── Feed event ──

use serde::{Deserialize, Serialize};

/// One delivery from the telemetry feed.
///
/// Transient: produced once per delivery and dropped after evaluation.
/// The payload is opaque text; structure is recovered by
/// [`DecodedPayload::decode`](crate::DecodedPayload::decode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Topic-like identifier of the originating stream, e.g. `sensors/x`.
    #[serde(alias = "topic")]
    pub channel: String,

    #[serde(alias = "payload", alias = "raw_payload")]
    pub raw_payload: String,

    /// Identifier of the feed connection that delivered the event.
    #[serde(
        default,
        alias = "connection_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_id: Option<String>,
}

impl RawEvent {
    pub fn new(channel: impl Into<String>, raw_payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            raw_payload: raw_payload.into(),
            connection_id: None,
        }
    }

    #[must_use]
    pub fn with_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_accepts_wire_aliases() {
        let evt: RawEvent =
            serde_json::from_str(r#"{"topic": "sensors/x", "payload": "42", "connection_id": "c1"}"#)
                .unwrap();
        assert_eq!(evt.channel, "sensors/x");
        assert_eq!(evt.raw_payload, "42");
        assert_eq!(evt.connection_id.as_deref(), Some("c1"));
    }

    #[test]
    fn serialize_uses_camel_case() {
        let evt = RawEvent::new("a/b", "{}").with_connection("conn-7");
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["rawPayload"], "{}");
        assert_eq!(json["connectionId"], "conn-7");
    }
}
