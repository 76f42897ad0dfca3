//! Typed stream messages.
//!
//! Messages travel as JSON objects discriminated by a `"type"` field. Fields the
//! mapper does not touch are kept in each message's `extra` map so their values
//! are re-emitted unchanged, after the known fields of the kind.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::MapperError;

/// Discriminator carried in a message's `"type"` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Schema,
    Record,
    State,
    ActivateVersion,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Schema => "SCHEMA",
            MessageKind::Record => "RECORD",
            MessageKind::State => "STATE",
            MessageKind::ActivateVersion => "ACTIVATE_VERSION",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEMA" => Ok(MessageKind::Schema),
            "RECORD" => Ok(MessageKind::Record),
            "STATE" => Ok(MessageKind::State),
            "ACTIVATE_VERSION" => Ok(MessageKind::ActivateVersion),
            other => Err(MapperError::UnsupportedMessageKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// JSON Schema body of a SCHEMA message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Field name -> property definition, in declaration order.
    pub properties: IndexMap<String, JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMessage {
    pub stream: String,
    pub schema: Schema,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_properties: Option<Vec<String>>,

    /// `bookmark_properties` and any other fields, untouched.
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    pub stream: String,
    pub record: IndexMap<String, JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_extracted: Option<String>,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub value: JsonValue,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivateVersionMessage {
    pub stream: String,
    pub version: i64,

    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// One message of the tap/target stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Schema(SchemaMessage),
    Record(RecordMessage),
    State(StateMessage),
    ActivateVersion(ActivateVersionMessage),
}

impl Message {
    /// Parse a raw JSON object, reading the kind from its `"type"` field.
    pub fn from_value(value: JsonValue) -> Result<Self, MapperError> {
        let kind = match value.get("type") {
            Some(JsonValue::String(kind)) => kind.parse::<MessageKind>()?,
            Some(other) => {
                return Err(MapperError::malformed(
                    "unknown",
                    format!("'type' must be a string, found {}", other),
                ))
            }
            None => return Err(MapperError::malformed("unknown", "missing 'type' field")),
        };

        Self::from_kind_and_value(kind, value)
    }

    /// Parse a raw JSON object whose kind is already known.
    ///
    /// A `"type"` field in `value`, if any, is dropped; the serialized
    /// message always carries the discriminator of `kind`.
    pub fn from_kind_and_value(kind: MessageKind, value: JsonValue) -> Result<Self, MapperError> {
        let body: Map<String, JsonValue> = match value {
            JsonValue::Object(map) => map.into_iter().filter(|(k, _)| k != "type").collect(),
            other => {
                return Err(MapperError::malformed(
                    kind.as_str(),
                    format!("expected a JSON object, found {}", other),
                ))
            }
        };

        let message = match kind {
            MessageKind::Schema => Message::Schema(parse_body(kind, body)?),
            MessageKind::Record => Message::Record(parse_body(kind, body)?),
            MessageKind::State => Message::State(parse_body(kind, body)?),
            MessageKind::ActivateVersion => Message::ActivateVersion(parse_body(kind, body)?),
        };

        Ok(message)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Schema(_) => MessageKind::Schema,
            Message::Record(_) => MessageKind::Record,
            Message::State(_) => MessageKind::State,
            Message::ActivateVersion(_) => MessageKind::ActivateVersion,
        }
    }

    /// Stream name, for the kinds that carry one.
    pub fn stream(&self) -> Option<&str> {
        match self {
            Message::Schema(m) => Some(&m.stream),
            Message::Record(m) => Some(&m.stream),
            Message::ActivateVersion(m) => Some(&m.stream),
            Message::State(_) => None,
        }
    }

    pub fn to_value(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<SchemaMessage> for Message {
    fn from(message: SchemaMessage) -> Self {
        Message::Schema(message)
    }
}

impl From<RecordMessage> for Message {
    fn from(message: RecordMessage) -> Self {
        Message::Record(message)
    }
}

fn parse_body<T: DeserializeOwned>(
    kind: MessageKind,
    body: Map<String, JsonValue>,
) -> Result<T, MapperError> {
    serde_json::from_value(JsonValue::Object(body))
        .map_err(|e| MapperError::malformed(kind.as_str(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            MessageKind::Schema,
            MessageKind::Record,
            MessageKind::State,
            MessageKind::ActivateVersion,
        ] {
            assert_eq!(kind.as_str().parse::<MessageKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let result = "BATCH".parse::<MessageKind>();
        assert_eq!(
            result,
            Err(MapperError::UnsupportedMessageKind {
                kind: "BATCH".to_string()
            })
        );
    }

    #[test]
    fn test_parse_schema_message() {
        let raw = json!({
            "type": "SCHEMA",
            "stream": "users",
            "schema": {
                "type": "object",
                "properties": {"id": {"type": "integer"}, "Name": {"type": "string"}},
                "required": ["id"]
            },
            "key_properties": ["id"],
            "bookmark_properties": ["updated_at"]
        });

        let message = Message::from_value(raw).unwrap();
        let Message::Schema(schema) = message else {
            panic!("expected schema message");
        };

        assert_eq!(schema.stream, "users");
        let names: Vec<&String> = schema.schema.properties.keys().collect();
        assert_eq!(names, vec!["id", "Name"]);
        assert_eq!(schema.schema.required, Some(vec!["id".to_string()]));
        assert_eq!(schema.schema.extra.get("type"), Some(&json!("object")));
        assert_eq!(schema.key_properties, Some(vec!["id".to_string()]));
        assert_eq!(
            schema.extra.get("bookmark_properties"),
            Some(&json!(["updated_at"]))
        );
    }

    #[test]
    fn test_schema_without_properties_is_malformed() {
        let raw = json!({"type": "SCHEMA", "stream": "users", "schema": {"type": "object"}});
        let result = Message::from_value(raw);
        assert!(matches!(
            result,
            Err(MapperError::MalformedMessage { ref kind, .. }) if kind == "SCHEMA"
        ));
    }

    #[test]
    fn test_record_must_be_object() {
        let raw = json!({"type": "RECORD", "stream": "users", "record": [1, 2]});
        assert!(matches!(
            Message::from_value(raw),
            Err(MapperError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let result = Message::from_value(json!({"stream": "users"}));
        assert!(matches!(result, Err(MapperError::MalformedMessage { .. })));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let result = Message::from_kind_and_value(MessageKind::State, json!("state"));
        assert!(matches!(result, Err(MapperError::MalformedMessage { .. })));
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let result = Message::from_value(json!({"type": "BATCH", "stream": "users"}));
        assert!(matches!(
            result,
            Err(MapperError::UnsupportedMessageKind { .. })
        ));
    }

    #[test]
    fn test_record_serializes_with_type_first() {
        let raw = json!({
            "type": "RECORD",
            "stream": "users",
            "record": {"b": 1, "a": 2},
            "time_extracted": "2024-01-01T00:00:00Z"
        });

        let message = Message::from_value(raw).unwrap();
        assert_eq!(message.kind(), MessageKind::Record);
        assert_eq!(message.stream(), Some("users"));
        assert_eq!(
            message.to_json().unwrap(),
            r#"{"type":"RECORD","stream":"users","record":{"b":1,"a":2},"time_extracted":"2024-01-01T00:00:00Z"}"#
        );
    }

    #[test]
    fn test_schema_known_fields_serialize_before_extra() {
        let raw = json!({
            "type": "SCHEMA",
            "stream": "s",
            "schema": {"type": "object", "properties": {"a": {}}, "required": ["a"]},
            "bookmark_properties": ["a"],
            "key_properties": ["a"]
        });

        let message = Message::from_value(raw).unwrap();
        assert_eq!(
            message.to_json().unwrap(),
            concat!(
                r#"{"type":"SCHEMA","stream":"s","#,
                r#""schema":{"properties":{"a":{}},"required":["a"],"type":"object"},"#,
                r#""key_properties":["a"],"bookmark_properties":["a"]}"#
            )
        );
    }

    #[test]
    fn test_state_and_activate_version_round_trip() {
        let state = json!({"type": "STATE", "value": {"bookmarks": {"users": {"id": 10}}}});
        let message = Message::from_value(state.clone()).unwrap();
        assert_eq!(message.stream(), None);
        assert_eq!(message.to_value().unwrap(), state);

        let activate = json!({"type": "ACTIVATE_VERSION", "stream": "users", "version": 3});
        let message = Message::from_value(activate.clone()).unwrap();
        assert_eq!(message.kind(), MessageKind::ActivateVersion);
        assert_eq!(message.to_value().unwrap(), activate);
    }
}
