//! Serialization configuration shared by all envelope variants.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::EnvelopeError;

/// Serializer selection. JSON is the only wire format the platforms we
/// target deliver; the enum keeps the configuration surface open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Serializer {
    /// JSON via serde_json.
    #[default]
    Json,
}

/// Key naming policy applied to payload object keys on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    /// Keys pass through untouched.
    #[default]
    Preserve,
    /// `user_name` becomes `userName`.
    CamelCase,
    /// `user_name` becomes `UserName`.
    PascalCase,
    /// Keys are normalized to `user_name`.
    SnakeCase,
}

impl NamingPolicy {
    /// Apply the policy to a single key.
    pub fn apply(&self, key: &str) -> String {
        match self {
            Self::Preserve => key.to_string(),
            Self::CamelCase => to_camel_case(key),
            Self::PascalCase => to_pascal_case(key),
            Self::SnakeCase => to_snake_case(key),
        }
    }
}

/// How `null` fields are treated when packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullHandling {
    /// Emit `null` fields as-is.
    #[default]
    Emit,
    /// Drop `null` fields from packed objects.
    Omit,
}

/// Serialization configuration consumed by envelopes.
///
/// Envelopes are the only place this configuration is applied; handlers see
/// typed values with Rust-side field names regardless of the wire policy.
#[derive(Debug, Clone, Default)]
pub struct SerializationConfig {
    /// Serializer selection.
    pub serializer: Serializer,
    /// Wire-side key naming policy.
    pub naming: NamingPolicy,
    /// Null field handling when packing.
    pub nulls: NullHandling,
}

impl SerializationConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the naming policy.
    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    /// Set null handling.
    pub fn with_nulls(mut self, nulls: NullHandling) -> Self {
        self.nulls = nulls;
        self
    }

    /// Serialize a typed value into wire bytes.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, EnvelopeError> {
        let value = serde_json::to_value(value)
            .map_err(|e| EnvelopeError::PayloadSerialization(e.to_string()))?;
        let value = rekey(value, &|key| self.naming.apply(key));
        let value = match self.nulls {
            NullHandling::Emit => value,
            NullHandling::Omit => strip_nulls(value),
        };
        serde_json::to_vec(&value).map_err(|e| EnvelopeError::PayloadSerialization(e.to_string()))
    }

    /// Deserialize wire bytes into a typed value.
    ///
    /// Incoming object keys are normalized to Rust-side snake_case before
    /// typed deserialization, so the same configuration reads both the
    /// policy's wire casing and already-snake input.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, EnvelopeError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| EnvelopeError::PayloadDeserialization(e.to_string()))?;
        let value = match self.naming {
            NamingPolicy::Preserve => value,
            _ => rekey(value, &to_snake_case),
        };
        serde_json::from_value(value)
            .map_err(|e| EnvelopeError::PayloadDeserialization(e.to_string()))
    }
}

/// Apply a key transform to every object key, recursively.
fn rekey(value: Value, transform: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (transform(&key), rekey(inner, transform)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rekey(item, transform))
                .collect(),
        ),
        other => other,
    }
}

/// Drop `null` members from objects, recursively.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, inner)| !inner.is_null())
                .map(|(key, inner)| (key, strip_nulls(inner)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let after_lower =
                i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let before_lower = i > 0
                && chars[i - 1].is_ascii_uppercase()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if after_lower || before_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

fn to_pascal_case(key: &str) -> String {
    to_snake_case(key)
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn to_camel_case(key: &str) -> String {
    let pascal = to_pascal_case(key);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        message: String,
        reply_to: Option<String>,
    }

    // === Case Conversion Tests ===

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Message"), "message");
        assert_eq!(to_snake_case("replyTo"), "reply_to");
        assert_eq!(to_snake_case("ReplyTo"), "reply_to");
        assert_eq!(to_snake_case("reply_to"), "reply_to");
        assert_eq!(to_snake_case("HTTPStatus"), "http_status");
    }

    #[test]
    fn test_to_pascal_and_camel_case() {
        assert_eq!(to_pascal_case("reply_to"), "ReplyTo");
        assert_eq!(to_camel_case("reply_to"), "replyTo");
        assert_eq!(to_pascal_case("message"), "Message");
    }

    // === Encode/Decode Tests ===

    #[test]
    fn test_encode_applies_naming_policy() {
        let config = SerializationConfig::new().with_naming(NamingPolicy::PascalCase);
        let bytes = config
            .encode(&Greeting {
                message: "hi".to_string(),
                reply_to: None,
            })
            .unwrap();

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["Message"], "hi");
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_encode_omits_nulls_when_configured() {
        let config = SerializationConfig::new().with_nulls(NullHandling::Omit);
        let bytes = config
            .encode(&Greeting {
                message: "hi".to_string(),
                reply_to: None,
            })
            .unwrap();

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("reply_to").is_none());
    }

    #[test]
    fn test_decode_normalizes_wire_casing() {
        let config = SerializationConfig::new().with_naming(NamingPolicy::PascalCase);
        let decoded: Greeting = config
            .decode(br#"{"Message":"hi","ReplyTo":"ops"}"#)
            .unwrap();

        assert_eq!(decoded.message, "hi");
        assert_eq!(decoded.reply_to.as_deref(), Some("ops"));
    }

    #[test]
    fn test_decode_accepts_snake_input_under_any_policy() {
        let config = SerializationConfig::new().with_naming(NamingPolicy::CamelCase);
        let decoded: Greeting = config
            .decode(br#"{"message":"hi","reply_to":null}"#)
            .unwrap();

        assert_eq!(decoded.message, "hi");
        assert_eq!(decoded.reply_to, None);
    }

    #[test]
    fn test_decode_malformed_input_fails() {
        let config = SerializationConfig::new();
        let err = config.decode::<Greeting>(b"{not json").unwrap_err();
        assert!(matches!(err, EnvelopeError::PayloadDeserialization(_)));
    }

    #[test]
    fn test_nested_objects_are_rekeyed() {
        let config = SerializationConfig::new().with_naming(NamingPolicy::CamelCase);
        let value = serde_json::json!({
            "outer_field": { "inner_field": 1 },
            "items": [ { "item_id": 2 } ]
        });
        let bytes = config.encode(&value).unwrap();
        let encoded: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(encoded["outerField"]["innerField"], 1);
        assert_eq!(encoded["items"][0]["itemId"], 2);
    }
}
