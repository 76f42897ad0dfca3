//! # map-sanitize: inline mapper for tap/target message streams
//!
//! Sits between a data extraction source and a loading destination and
//! rewrites the message stream on the way through:
//!
//! - **Key casing**: rename record fields and schema properties to snake_case
//!   and/or kebab-case (snake first when both are on)
//! - **Value cleanup**: trim strings, turn empty strings into null, collapse
//!   whitespace runs (in that order)
//!
//! SCHEMA `properties`, `required` and `key_properties` are renamed together so
//! they stay consistent. STATE and ACTIVATE_VERSION messages pass through.
//!
//! ## Example
//!
//! ```ignore
//! use map_sanitize::{InlineMapper, SanitizeConfig, SanitizeMapper};
//! use serde_json::json;
//!
//! let mapper = SanitizeMapper::new(SanitizeConfig {
//!     keys_snake_case: true,
//!     values_trim_strings: true,
//!     ..Default::default()
//! });
//!
//! let out: Vec<_> = mapper
//!     .map_value(json!({"type": "RECORD", "stream": "users", "record": {"First Name": " Ada "}}))?
//!     .collect();
//! // {"type":"RECORD","stream":"users","record":{"first_name":"Ada"}}
//! ```

pub mod config;
pub mod error;
pub mod mapper;
pub mod message;
pub mod rules;
pub mod serialization;
pub mod stream;

pub use config::{ConfigSource, SanitizeConfig};
pub use error::{ConfigError, MapperError, StreamError};
pub use mapper::{InlineMapper, MappedMessages, SanitizeMapper};
pub use message::{
    ActivateVersionMessage, Message, MessageKind, RecordMessage, Schema, SchemaMessage,
    StateMessage,
};
pub use rules::{transform_key, transform_value, KeyStep, RulePipeline, ValueStep};
pub use serialization::{NdjsonReader, NdjsonWriter};
pub use stream::{ErrorPolicy, StreamProcessor, StreamStats};
