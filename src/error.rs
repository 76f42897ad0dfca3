//! Error types for message mapping, configuration loading, and stream I/O.

use std::fmt;

/// Error raised while turning a raw message into mapped output.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperError {
    /// The message kind is not one of SCHEMA, RECORD, STATE, ACTIVATE_VERSION.
    UnsupportedMessageKind { kind: String },
    /// The raw message does not fit the typed shape of its kind.
    MalformedMessage { kind: String, reason: String },
}

impl MapperError {
    pub fn malformed(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        MapperError::MalformedMessage {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MapperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperError::UnsupportedMessageKind { kind } => {
                write!(f, "Unsupported message kind: {}", kind)
            }
            MapperError::MalformedMessage { kind, reason } => {
                write!(f, "Malformed {} message: {}", kind, reason)
            }
        }
    }
}

impl std::error::Error for MapperError {}

/// Error raised while loading mapper configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Parse { path: String, reason: String },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read config file {}: {}", path, source)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "Failed to parse config file {}: {}", path, reason)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error raised by the line-delimited stream processor.
#[derive(Debug)]
pub enum StreamError {
    Io(std::io::Error),
    Json { line: usize, source: serde_json::Error },
    Mapper { line: usize, source: MapperError },
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Io(err)
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Io(e) => write!(f, "IO error: {}", e),
            StreamError::Json { line, source } => {
                write!(f, "Invalid JSON on line {}: {}", line, source)
            }
            StreamError::Mapper { line, source } => write!(f, "Line {}: {}", line, source),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Io(e) => Some(e),
            StreamError::Json { source, .. } => Some(source),
            StreamError::Mapper { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapper_error_display() {
        let err = MapperError::UnsupportedMessageKind {
            kind: "BATCH".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported message kind: BATCH");

        let err = MapperError::malformed("SCHEMA", "missing field `properties`");
        assert_eq!(
            err.to_string(),
            "Malformed SCHEMA message: missing field `properties`"
        );
    }

    #[test]
    fn test_stream_error_wraps_mapper_error() {
        let err = StreamError::Mapper {
            line: 3,
            source: MapperError::UnsupportedMessageKind {
                kind: "BATCH".to_string(),
            },
        };
        assert_eq!(err.to_string(), "Line 3: Unsupported message kind: BATCH");
    }
}
