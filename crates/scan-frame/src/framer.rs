//! Newline framing for scanner streams.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::error::{FrameError, Result};

/// Default upper bound for a single line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Splits a byte stream into trimmed, non-empty text lines.
///
/// `\r\n` endings are accepted, bytes that are not valid UTF-8 are replaced
/// rather than rejected, and blank lines are skipped. A line longer than the
/// configured maximum is a stream error.
#[derive(Debug, Clone)]
pub struct LineFramer {
    max_length: usize,
    /// Offset up to which the buffer is known to contain no newline.
    next_index: usize,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn to_line(bytes: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(bytes);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineFramer {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        loop {
            let Some(offset) = memchr::memchr(b'\n', &src[self.next_index..]) else {
                if src.len() > self.max_length {
                    return Err(FrameError::LineTooLong {
                        max: self.max_length,
                    });
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let newline = self.next_index + offset;
            self.next_index = 0;

            if newline > self.max_length {
                return Err(FrameError::LineTooLong {
                    max: self.max_length,
                });
            }

            let line = src.split_to(newline + 1);
            if let Some(text) = Self::to_line(&line[..newline]) {
                return Ok(Some(text));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        // Trailing data without a final newline still forms a record.
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        Ok(Self::to_line(&rest))
    }
}
