use std::borrow::Cow;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::codec::{encode, encoded_len};
use crate::error::EncodeError;

/// Payload carried by a frame.
///
/// Text is written verbatim. Structured values are written as their
/// canonical JSON text. On decode, payload text that parses as JSON becomes
/// [`Payload::Json`]; anything else stays [`Payload::Text`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    /// Convert any serializable value into a JSON payload.
    pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, EncodeError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Interpret decoded payload text, falling back to plain text when it is not JSON.
    pub fn parse(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }

    /// The bytes written to the wire for this payload.
    pub fn wire_bytes(&self) -> Result<Cow<'_, [u8]>, EncodeError> {
        match self {
            Self::Text(text) => Ok(Cow::Borrowed(text.as_bytes())),
            Self::Json(value) => Ok(Cow::Owned(serde_json::to_vec(value)?)),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Fold the payload into a single JSON value (text becomes a JSON string).
    pub fn into_value(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text),
            Self::Json(value) => value,
        }
    }

    /// Short kind label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Json(Value::Null) => "null",
            Self::Json(Value::Bool(_)) => "bool",
            Self::Json(Value::Number(_)) => "number",
            Self::Json(Value::String(_)) => "string",
            Self::Json(Value::Array(_)) => "array",
            Self::Json(Value::Object(_)) => "object",
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// A decoded event with its optional payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Event name.
    pub event: String,
    /// Payload, or `None` when the frame carried the "no payload" sentinel.
    pub payload: Option<Payload>,
}

impl Message {
    /// Create a new message.
    pub fn new(event: impl Into<String>, payload: Option<Payload>) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Encode this message into a frame.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        encode(&self.event, self.payload.as_ref())
    }

    /// The total wire size of this message once framed.
    pub fn wire_size(&self) -> Result<usize, EncodeError> {
        encoded_len(&self.event, self.payload.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn parse_keeps_non_json_text() {
        assert_eq!(
            Payload::parse("string data".to_string()),
            Payload::Text("string data".to_string())
        );
        assert_eq!(Payload::parse(String::new()), Payload::Text(String::new()));
    }

    #[test]
    fn parse_recognizes_json_values() {
        assert_eq!(Payload::parse("4.4".to_string()), Payload::Json(json!(4.4)));
        assert_eq!(
            Payload::parse("{\"a\":1}".to_string()),
            Payload::Json(json!({"a": 1}))
        );
        assert_eq!(Payload::parse("null".to_string()), Payload::Json(Value::Null));
    }

    #[test]
    fn to_json_rejects_non_string_map_keys() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "value");
        let err = Payload::to_json(&map).unwrap_err();
        assert!(matches!(err, EncodeError::Serialize(_)));
    }

    #[test]
    fn into_value_folds_text_into_string() {
        assert_eq!(Payload::from("hi").into_value(), json!("hi"));
        assert_eq!(Payload::from(json!([1, 2])).into_value(), json!([1, 2]));
    }

    #[test]
    fn untagged_serialization_matches_payload_shape() {
        let text = serde_json::to_string(&Payload::from("plain")).unwrap();
        let obj = serde_json::to_string(&Payload::from(json!({"k": true}))).unwrap();
        assert_eq!(text, "\"plain\"");
        assert_eq!(obj, "{\"k\":true}");
    }

    #[test]
    fn message_wire_size_matches_encoding() {
        let msg = Message::new("evt", Some(Payload::from(json!({"a": [1, 2, 3]}))));
        let frame = msg.encode().unwrap();
        assert_eq!(msg.wire_size().unwrap(), frame.len());
    }
}
