//! Message dispatch and the sanitize mapper.
//!
//! An [`InlineMapper`] turns each input message into zero or more output
//! messages. Dispatch is an exhaustive match over [`Message`], so every kind
//! has exactly one handler.

use serde_json::{json, Value as JsonValue};

use crate::config::SanitizeConfig;
use crate::error::MapperError;
use crate::message::{
    ActivateVersionMessage, Message, MessageKind, RecordMessage, SchemaMessage, StateMessage,
};
use crate::rules::RulePipeline;

/// Output of mapping one input message. Single pass, finite.
pub type MappedMessages = std::vec::IntoIter<Message>;

fn one(message: impl Into<Message>) -> MappedMessages {
    vec![message.into()].into_iter()
}

/// Trait for stream mappers sitting between a tap and a target.
///
/// Implementors provide the SCHEMA and RECORD handlers; STATE and
/// ACTIVATE_VERSION pass through unless overridden.
pub trait InlineMapper {
    fn name(&self) -> &str;

    fn map_schema_message(&self, message: SchemaMessage) -> MappedMessages;

    fn map_record_message(&self, message: RecordMessage) -> MappedMessages;

    fn map_state_message(&self, message: StateMessage) -> MappedMessages {
        one(Message::State(message))
    }

    fn map_activate_version_message(&self, message: ActivateVersionMessage) -> MappedMessages {
        one(Message::ActivateVersion(message))
    }

    /// Route a typed message to the handler for its kind.
    fn map_message(&self, message: Message) -> MappedMessages {
        match message {
            Message::Schema(m) => self.map_schema_message(m),
            Message::Record(m) => self.map_record_message(m),
            Message::State(m) => self.map_state_message(m),
            Message::ActivateVersion(m) => self.map_activate_version_message(m),
        }
    }

    /// Parse `raw` as a message of the declared `kind` and map it.
    ///
    /// # Errors
    /// * `UnsupportedMessageKind` - `kind` is not a known message kind
    /// * `MalformedMessage` - `raw` does not have the shape of `kind`
    fn dispatch(&self, kind: &str, raw: JsonValue) -> Result<MappedMessages, MapperError> {
        let kind: MessageKind = kind.parse()?;
        let message = Message::from_kind_and_value(kind, raw)?;
        Ok(self.map_message(message))
    }

    /// Parse `raw`, taking the kind from its `"type"` field, and map it.
    fn map_value(&self, raw: JsonValue) -> Result<MappedMessages, MapperError> {
        let message = Message::from_value(raw)?;
        Ok(self.map_message(message))
    }
}

/// Renames keys and normalizes string values of SCHEMA and RECORD messages.
///
/// Key collisions after renaming are last-write-wins: when two original keys
/// map to the same new key, the entry later in iteration order is kept, at the
/// position of the first.
#[derive(Debug, Clone)]
pub struct SanitizeMapper {
    config: SanitizeConfig,
    rules: RulePipeline,
}

impl SanitizeMapper {
    pub const NAME: &'static str = "map-sanitize";

    pub fn new(config: SanitizeConfig) -> Self {
        let rules = RulePipeline::from_config(&config);
        Self { config, rules }
    }

    pub fn config(&self) -> &SanitizeConfig {
        &self.config
    }

    pub fn rules(&self) -> &RulePipeline {
        &self.rules
    }

    /// Rename `properties`, `required` and `key_properties` with the same key
    /// rule so they keep referring to each other. Definitions are untouched.
    pub fn rewrite_schema(&self, mut message: SchemaMessage) -> SchemaMessage {
        let properties = std::mem::take(&mut message.schema.properties);
        message.schema.properties = properties
            .into_iter()
            .map(|(key, definition)| (self.rules.transform_key(&key), definition))
            .collect();

        if let Some(required) = message.schema.required.take() {
            message.schema.required = Some(self.rename_all(&required));
        }
        if let Some(key_properties) = message.key_properties.take() {
            message.key_properties = Some(self.rename_all(&key_properties));
        }

        message
    }

    /// Rename every record key and normalize every value.
    pub fn rewrite_record(&self, mut message: RecordMessage) -> RecordMessage {
        let record = std::mem::take(&mut message.record);
        message.record = record
            .into_iter()
            .map(|(key, value)| {
                (
                    self.rules.transform_key(&key),
                    self.rules.transform_value(value),
                )
            })
            .collect();

        message
    }

    fn rename_all(&self, keys: &[String]) -> Vec<String> {
        keys.iter().map(|k| self.rules.transform_key(k)).collect()
    }

    /// Name, version and settings schema, as printed by `--about`.
    pub fn about() -> JsonValue {
        json!({
            "name": Self::NAME,
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "version": env!("CARGO_PKG_VERSION"),
            "settings": SanitizeConfig::json_schema(),
        })
    }
}

impl InlineMapper for SanitizeMapper {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn map_schema_message(&self, message: SchemaMessage) -> MappedMessages {
        let message = self.rewrite_schema(message);
        tracing::info!(
            stream = %message.stream,
            properties = message.schema.properties.len(),
            "Rewrote schema"
        );
        one(message)
    }

    fn map_record_message(&self, message: RecordMessage) -> MappedMessages {
        tracing::debug!(stream = %message.stream, fields = message.record.len(), "Rewriting record");
        one(self.rewrite_record(message))
    }
}
