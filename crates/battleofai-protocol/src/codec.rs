//! Request encoding and response-body decoding.
//!
//! The service is inconsistent about content types: most endpoints answer
//! with JSON, but some answer with a bare `true` or `42` as `text/plain`.
//! [`Body`] captures whichever arrived, and its accessors accept a boolean
//! or integer in either form so callers never care which one it was.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Serializes a request payload to JSON bytes.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(value).map_err(ProtocolError::Encode)
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Text(String),
}

impl Body {
    /// Decodes raw bytes, as JSON when `is_json` (the response declared
    /// `application/json`), otherwise as UTF-8 text.
    pub fn decode(bytes: &[u8], is_json: bool) -> Result<Self, ProtocolError> {
        if is_json {
            serde_json::from_slice(bytes)
                .map(Body::Json)
                .map_err(ProtocolError::Decode)
        } else {
            Ok(Body::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
    }

    /// Deserializes a JSON body into `T`.
    ///
    /// A text body is tried as JSON too, since some deployments forget the
    /// content-type header.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ProtocolError> {
        match self {
            Body::Json(value) => serde_json::from_value(value).map_err(ProtocolError::Decode),
            Body::Text(text) => serde_json::from_str(&text).map_err(ProtocolError::Decode),
        }
    }

    /// Reads the body as a boolean: JSON `true`/`false`, or the same words
    /// as text (case-insensitive).
    pub fn as_bool(&self) -> Result<bool, ProtocolError> {
        match self {
            Body::Json(serde_json::Value::Bool(b)) => Ok(*b),
            Body::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(ProtocolError::UnexpectedBody(format!(
                    "expected a boolean, got {other:?}"
                ))),
            },
            Body::Json(other) => Err(ProtocolError::UnexpectedBody(format!(
                "expected a boolean, got {other}"
            ))),
        }
    }

    /// Reads the body as an unsigned integer: a JSON number, or digits as
    /// text.
    pub fn as_u64(&self) -> Result<u64, ProtocolError> {
        match self {
            Body::Json(serde_json::Value::Number(n)) => n.as_u64().ok_or_else(|| {
                ProtocolError::UnexpectedBody(format!("expected an unsigned integer, got {n}"))
            }),
            Body::Text(text) => text.trim().parse().map_err(|_| {
                ProtocolError::UnexpectedBody(format!("expected an integer, got {text:?}"))
            }),
            Body::Json(other) => Err(ProtocolError::UnexpectedBody(format!(
                "expected an integer, got {other}"
            ))),
        }
    }

    /// The human-readable message of an error response: the JSON
    /// `message` field, or the whole text body. Empty when neither exists.
    pub fn message(&self) -> String {
        match self {
            Body::Json(value) => value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string(),
            Body::Text(text) => text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json_body() {
        let body = Body::decode(br#"{"success":true}"#, true).unwrap();
        assert_eq!(body, Body::Json(json!({"success": true})));
    }

    #[test]
    fn test_decode_malformed_json_is_error() {
        assert!(matches!(
            Body::decode(b"{nope", true),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_as_bool_accepts_json_and_text() {
        assert!(Body::Json(json!(true)).as_bool().unwrap());
        assert!(!Body::Text("false\n".into()).as_bool().unwrap());
        assert!(Body::Text("True".into()).as_bool().unwrap());
        assert!(Body::Text("maybe".into()).as_bool().is_err());
        assert!(Body::Json(json!(1)).as_bool().is_err());
    }

    #[test]
    fn test_as_u64_accepts_json_and_text() {
        assert_eq!(Body::Json(json!(42)).as_u64().unwrap(), 42);
        assert_eq!(Body::Text(" 17 ".into()).as_u64().unwrap(), 17);
        assert!(Body::Text("x".into()).as_u64().is_err());
        assert!(Body::Json(json!(-3)).as_u64().is_err());
    }

    #[test]
    fn test_message_prefers_json_field_then_text() {
        assert_eq!(Body::Json(json!({"message": "bad token"})).message(), "bad token");
        assert_eq!(Body::Json(json!({"error": 1})).message(), "");
        assert_eq!(Body::Text("gone".into()).message(), "gone");
    }

    #[test]
    fn test_into_json_parses_text_body() {
        let v: Vec<u32> = Body::Text("[1,2]".into()).into_json().unwrap();
        assert_eq!(v, vec![1, 2]);
    }
}
