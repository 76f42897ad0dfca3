//! Line-delimited stream processing.
//!
//! Reads messages one at a time, maps each one, and writes the results before
//! reading the next, so output order always matches input order.

use std::io::{BufRead, Write};

use crate::error::StreamError;
use crate::mapper::InlineMapper;
use crate::serialization::{NdjsonReader, NdjsonWriter};

/// What to do with a message that cannot be mapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ErrorPolicy {
    /// Stop at the first bad message.
    #[default]
    Abort,
    /// Log the message, count it, and keep going.
    Skip,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub read: usize,
    pub written: usize,
    pub skipped: usize,
}

pub struct StreamProcessor<'a, M: InlineMapper> {
    mapper: &'a M,
    policy: ErrorPolicy,
}

impl<'a, M: InlineMapper> StreamProcessor<'a, M> {
    pub fn new(mapper: &'a M) -> Self {
        Self {
            mapper,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Map every message from `input` and write the results to `output`.
    ///
    /// # Errors
    /// I/O errors are always fatal. Bad lines and unmappable messages are
    /// fatal under [`ErrorPolicy::Abort`] and skipped under
    /// [`ErrorPolicy::Skip`].
    pub fn run<R: BufRead, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<StreamStats, StreamError> {
        let mut reader = NdjsonReader::new(input);
        let mut writer = NdjsonWriter::new(output);
        let mut stats = StreamStats::default();

        loop {
            let (line, raw) = match reader.read_value() {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err @ StreamError::Json { .. }) => {
                    stats.read += 1;
                    self.handle_error(err, &mut stats)?;
                    continue;
                }
                Err(err) => return Err(err),
            };
            stats.read += 1;

            let mapped = match self.mapper.map_value(raw) {
                Ok(mapped) => mapped,
                Err(source) => {
                    self.handle_error(StreamError::Mapper { line, source }, &mut stats)?;
                    continue;
                }
            };

            for message in mapped {
                writer.write(&message)?;
                stats.written += 1;
            }
        }

        writer.flush()?;
        tracing::info!(
            mapper = self.mapper.name(),
            read = stats.read,
            written = stats.written,
            skipped = stats.skipped,
            "Stream complete"
        );

        Ok(stats)
    }

    fn handle_error(&self, err: StreamError, stats: &mut StreamStats) -> Result<(), StreamError> {
        match self.policy {
            ErrorPolicy::Abort => Err(err),
            ErrorPolicy::Skip => {
                tracing::warn!("Skipping message: {}", err);
                stats.skipped += 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SanitizeConfig;
    use crate::error::MapperError;
    use crate::mapper::SanitizeMapper;
    use std::io::Cursor;

    const INPUT: &str = concat!(
        r#"{"type": "SCHEMA", "stream": "s", "schema": {"properties": {"A B": {}}}}"#,
        "\n",
        r#"{"type": "BATCH", "stream": "s"}"#,
        "\n",
        r#"{"type": "RECORD", "stream": "s", "record": {"A B": 1}}"#,
        "\n",
    );

    fn mapper() -> SanitizeMapper {
        SanitizeMapper::new(SanitizeConfig {
            keys_snake_case: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_abort_on_unsupported_kind() {
        let mapper = mapper();
        let mut output = Vec::new();
        let err = StreamProcessor::new(&mapper)
            .run(Cursor::new(INPUT), &mut output)
            .unwrap_err();

        assert!(matches!(
            err,
            StreamError::Mapper {
                line: 2,
                source: MapperError::UnsupportedMessageKind { .. }
            }
        ));
    }

    #[test]
    fn test_skip_continues() {
        let mapper = mapper();
        let mut output = Vec::new();
        let stats = StreamProcessor::new(&mapper)
            .with_policy(ErrorPolicy::Skip)
            .run(Cursor::new(INPUT), &mut output)
            .unwrap();

        assert_eq!(
            stats,
            StreamStats {
                read: 3,
                written: 2,
                skipped: 1
            }
        );

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"type":"SCHEMA","stream":"s","schema":{"properties":{"a_b":{}}}}"#,
                r#"{"type":"RECORD","stream":"s","record":{"a_b":1}}"#,
            ]
        );
    }

    #[test]
    fn test_skip_invalid_json() {
        let mapper = mapper();
        let mut output = Vec::new();
        let input = "garbage\n{\"type\": \"STATE\", \"value\": 1}\n";
        let stats = StreamProcessor::new(&mapper)
            .with_policy(ErrorPolicy::Skip)
            .run(Cursor::new(input), &mut output)
            .unwrap();

        assert_eq!(stats.read, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.written, 1);
    }

    #[test]
    fn test_skip_invalid_utf8_line() {
        let mapper = mapper();
        let mut output = Vec::new();
        let input: &[u8] =
            b"{\"type\": \"STATE\", \"value\": 1}\n\xff\n{\"type\": \"STATE\", \"value\": 2}\n";
        let stats = StreamProcessor::new(&mapper)
            .with_policy(ErrorPolicy::Skip)
            .run(Cursor::new(input), &mut output)
            .unwrap();

        assert_eq!(
            stats,
            StreamStats {
                read: 3,
                written: 2,
                skipped: 1
            }
        );
        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output.lines().collect::<Vec<_>>(),
            vec![
                r#"{"type":"STATE","value":1}"#,
                r#"{"type":"STATE","value":2}"#
            ]
        );
    }

    #[test]
    fn test_abort_on_invalid_utf8_reports_line() {
        let mapper = mapper();
        let mut output = Vec::new();
        let input: &[u8] = b"{\"type\": \"STATE\", \"value\": 1}\n\xff\n";
        let err = StreamProcessor::new(&mapper)
            .run(Cursor::new(input), &mut output)
            .unwrap_err();

        assert!(matches!(err, StreamError::Json { line: 2, .. }));
    }

    #[test]
    fn test_empty_input() {
        let mapper = mapper();
        let mut output = Vec::new();
        let stats = StreamProcessor::new(&mapper)
            .run(Cursor::new(""), &mut output)
            .unwrap();

        assert_eq!(stats, StreamStats::default());
        assert!(output.is_empty());
    }
}
