//! Bundle - opaque payloads at the system boundary
//!
//! `pack` encodes a JSON value as base64 (standard alphabet). `unpack` never
//! fails: anything malformed (bad base64, bad UTF-8, bad JSON, a non-object)
//! comes back as an empty map, since callers treat missing data as default.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{FlowdocError, Result};

pub fn pack(value: &Value) -> String {
    STANDARD.encode(value.to_string())
}

pub fn unpack(data: &str) -> Map<String, Value> {
    unpack_bytes(data.trim().as_bytes())
}

pub fn unpack_bytes(data: &[u8]) -> Map<String, Value> {
    match decode(data) {
        Ok(map) => map,
        Err(err) => {
            debug!(code = err.code(), %err, "bundle: returning empty mapping");
            Map::new()
        }
    }
}

fn decode(data: &[u8]) -> Result<Map<String, Value>> {
    let malformed = |reason: String| FlowdocError::MalformedBundle { reason };
    let raw = STANDARD
        .decode(data)
        .map_err(|e| malformed(format!("not base64: {}", e)))?;
    let text = String::from_utf8(raw).map_err(|e| malformed(format!("not UTF-8: {}", e)))?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(malformed(format!("expected an object, found {}", kind(&other)))),
        Err(e) => Err(malformed(format!("not JSON: {}", e))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn pack_then_unpack() {
        let value = json!({"workflow": "tasks:\n  t1:\n", "coords": {"t1": [1.5, 2.0]}});
        let packed = pack(&value);
        assert!(!packed.contains('{'));
        assert_eq!(Value::Object(unpack(&packed)), value);
    }

    #[test]
    fn malformed_input_is_empty_mapping() {
        assert!(unpack("not valid data").is_empty());
        assert!(unpack("").is_empty());
        assert!(unpack(&pack(&json!([1, 2, 3]))).is_empty());
        assert!(unpack(&STANDARD.encode("{\"truncated\": ")).is_empty());
        assert!(unpack_bytes(&[0xff, 0xfe, 0x00]).is_empty());
        assert!(unpack_bytes(STANDARD.encode([0xc3, 0x28]).as_bytes()).is_empty());
    }

    proptest! {
        #[test]
        fn unpack_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = unpack_bytes(&data);
        }

        #[test]
        fn unpack_of_arbitrary_text_is_a_map(text in ".*") {
            let map = unpack(&text);
            prop_assert!(map.is_empty() || STANDARD.decode(text.trim()).is_ok());
        }
    }
}
