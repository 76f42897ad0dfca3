//! Newline-delimited JSON codec for message streams.
//!
//! One JSON object per line in both directions. Blank lines on input are
//! ignored.

use std::io::{BufRead, Write};

use serde_json::Value as JsonValue;

use crate::error::StreamError;
use crate::message::Message;

/// NDJSON reader yielding `(line_number, value)` pairs.
///
/// Line numbers are 1-based and count blank lines.
pub struct NdjsonReader<R: BufRead> {
    reader: R,
    line_number: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> NdjsonReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buf: Vec::new(),
        }
    }

    /// Read the next non-blank line and parse it as JSON.
    ///
    /// Returns `Ok(None)` at end of input. A line that is not valid UTF-8 or
    /// not valid JSON is a [`StreamError::Json`] for that line; reading can
    /// continue with the next line afterwards.
    pub fn read_value(&mut self) -> Result<Option<(usize, JsonValue)>, StreamError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let value = serde_json::from_slice(&self.buf).map_err(|source| StreamError::Json {
                line: self.line_number,
                source,
            })?;
            return Ok(Some((self.line_number, value)));
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

/// NDJSON writer: one message per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a single message as an NDJSON line
    pub fn write(&mut self, message: &Message) -> Result<(), StreamError> {
        let json = message.to_json().map_err(|e| StreamError::Io(e.into()))?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
