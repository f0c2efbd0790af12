//! Best-effort decoding of raw records into display-ready messages.

use kim_adapters::RawRecord;
use kim_types::Message;

/// Pretty-print `bytes` as JSON (two-space indent) when they parse as JSON,
/// otherwise return them as (lossy) UTF-8 text.
pub fn format_value(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    serde_json::from_slice::<serde_json::Value>(bytes)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

/// Convert a raw record into a [`Message`].
pub fn decode_record(record: RawRecord) -> Message {
    let RawRecord {
        topic,
        partition,
        offset,
        timestamp_ms,
        key,
        value,
        headers,
    } = record;

    Message {
        topic,
        partition,
        offset,
        timestamp_ms: timestamp_ms.unwrap_or(0),
        key: key
            .map(|k| String::from_utf8_lossy(&k).into_owned())
            .unwrap_or_default(),
        value: value.as_deref().map(format_value).unwrap_or_default(),
        headers: headers
            .into_iter()
            .map(|(k, v)| (k, String::from_utf8_lossy(&v).into_owned()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_pretty_printed() {
        assert_eq!(format_value(br#"{"a":1}"#), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn nested_json_keeps_two_space_indent() {
        assert_eq!(
            format_value(br#"{"a":{"c":null},"b":[1,2]}"#),
            "{\n  \"a\": {\n    \"c\": null\n  },\n  \"b\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(format_value(b"v1"), "v1");
        assert_eq!(format_value(b"{not json"), "{not json");
        assert_eq!(format_value(b""), "");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(format_value(&[0x66, 0xff, 0x6f]), "f\u{fffd}o");
    }

    #[test]
    fn decode_fills_defaults() {
        let msg = decode_record(RawRecord {
            topic: "orders".into(),
            partition: 1,
            offset: 9,
            timestamp_ms: None,
            key: None,
            value: Some(br#"{"id":7}"#.to_vec()),
            headers: vec![("trace".into(), b"abc".to_vec())],
        });
        assert_eq!(msg.key, "");
        assert_eq!(msg.timestamp_ms, 0);
        assert_eq!(msg.value, "{\n  \"id\": 7\n}");
        assert_eq!(msg.headers.get("trace").map(String::as_str), Some("abc"));
    }
}
