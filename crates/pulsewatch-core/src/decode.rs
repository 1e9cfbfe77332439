// ── Payload decoding ──
//
// Normalizes an opaque feed payload into a keyed view the evaluator can
// query. Decoding never fails: anything that is not a JSON object is kept
// verbatim under `rawPayload`.

use serde::Serialize;
use serde_json::{Map, Value};

/// Key under which non-structured payloads are exposed.
pub const RAW_PAYLOAD_KEY: &str = "rawPayload";

/// Keys checked, in order, for a device identifier.
const DEVICE_ID_KEYS: &[&str] = &["deviceId", "device_id", "id"];

/// Keyed view over one event payload. Always holds a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DecodedPayload(Value);

impl DecodedPayload {
    /// Decode `raw` as a JSON object, degrading to `{"rawPayload": raw}`.
    ///
    /// Bare scalars (`42.5`, `"ok"`, `true`) and arrays count as
    /// non-structured: only objects can be addressed by key.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(object @ Value::Object(_)) => Self(object),
            Ok(_) | Err(_) => {
                let mut map = Map::with_capacity(1);
                map.insert(RAW_PAYLOAD_KEY.to_owned(), Value::String(raw.to_owned()));
                Self(Value::Object(map))
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Resolve a dotted path, drilling through nested objects.
    ///
    /// Numeric segments index into arrays (`readings.0.value`). A missing
    /// segment, or a scalar where a container is expected, yields `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// First non-null of `deviceId`, `device_id`, `id`, rendered as text.
    pub fn device_id(&self) -> Option<String> {
        DEVICE_ID_KEYS
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find(|v| !v.is_null())
            .map(value_to_text)
    }

    /// The whole payload, borrowed.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Text form of a JSON value: strings unquoted, everything else as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_payload_decodes_as_is() {
        let p = DecodedPayload::decode(r#"{"Index": 65, "unit": "pct"}"#);
        assert_eq!(p.get("Index"), Some(&json!(65)));
        assert_eq!(p.get("unit"), Some(&json!("pct")));
        assert!(p.get(RAW_PAYLOAD_KEY).is_none());
    }

    #[test]
    fn bare_number_degrades_to_raw_payload() {
        let p = DecodedPayload::decode("42.5");
        assert_eq!(p.as_value().as_object().map(Map::len), Some(1));
        assert_eq!(p.get(RAW_PAYLOAD_KEY), Some(&json!("42.5")));
    }

    #[test]
    fn garbage_degrades_to_raw_payload() {
        let p = DecodedPayload::decode("{not json");
        assert_eq!(p.get(RAW_PAYLOAD_KEY), Some(&json!("{not json")));
    }

    #[test]
    fn array_payload_degrades_to_raw_payload() {
        let p = DecodedPayload::decode("[1,2,3]");
        assert_eq!(p.get(RAW_PAYLOAD_KEY), Some(&json!("[1,2,3]")));
    }

    #[test]
    fn lookup_drills_through_nested_objects() {
        let p = DecodedPayload::decode(r#"{"a": {"b": {"c": 7}}, "list": [{"v": 1}, {"v": 2}]}"#);
        assert_eq!(p.lookup("a.b.c"), Some(&json!(7)));
        assert_eq!(p.lookup("list.1.v"), Some(&json!(2)));
        assert!(p.lookup("a.b.c.d").is_none());
        assert!(p.lookup("a.x").is_none());
        assert!(p.lookup("list.9.v").is_none());
    }

    #[test]
    fn device_id_prefers_camel_case_key() {
        let p = DecodedPayload::decode(r#"{"id": 3, "device_id": "snake", "deviceId": "camel"}"#);
        assert_eq!(p.device_id().as_deref(), Some("camel"));

        let p = DecodedPayload::decode(r#"{"deviceId": null, "id": 3}"#);
        assert_eq!(p.device_id().as_deref(), Some("3"));

        assert!(DecodedPayload::decode("plain").device_id().is_none());
    }
}
