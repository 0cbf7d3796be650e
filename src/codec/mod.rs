//! Value Codec
//!
//! Pack/unpack indirection between store values and the bytes placed in a
//! data region. Pure and side-effect free; the store treats the encoding
//! as opaque.
//!
//! Values are JSON: `pack` emits the serialized form, `unpack` parses it
//! back. Bytes that are not valid JSON but are valid UTF-8 decode as a
//! plain string, so a region filled through the textual fallback still
//! reads back as a value.

use crate::error::{Result, StoreError};
use serde_json::Value;

/// Serialize a value into region bytes.
pub fn pack(value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Decode region bytes back into a value.
///
/// Falls back to a textual reading when the bytes are not JSON.
pub fn unpack(bytes: &[u8]) -> Result<Value> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(json_err) => match std::str::from_utf8(bytes) {
            Ok(text) => Ok(Value::String(text.to_string())),
            Err(_) => Err(StoreError::Decode(json_err.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roundtrip_object() {
        let value = json!({"n": 1, "tags": ["a", "b"], "nested": {"ok": true}});
        let bytes = pack(&value).unwrap();
        assert_eq!(unpack(&bytes).unwrap(), value);
    }

    #[test]
    fn test_roundtrip_scalars() {
        for value in [json!(0), json!(-7), json!(3.5), json!("text"), json!(false)] {
            let bytes = pack(&value).unwrap();
            assert_eq!(unpack(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_text_fallback() {
        let value = unpack(b"not json at all").unwrap();
        assert_eq!(value, Value::String("not json at all".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        assert!(unpack(&[0xff, 0xfe, 0x80]).is_err());
    }
}
