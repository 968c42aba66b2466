//! Reassembles newline-delimited text lines from arbitrary byte chunks.
//!
//! Bytes are buffered raw and only decoded as UTF-8 once a full line is
//! available, so a chunk boundary may fall anywhere, including inside a
//! multi-byte character.

use vigil_core::config::DEFAULT_MAX_LINE_BYTES;
use vigil_core::error::DecodeError;

/// Line buffer for one stream.
#[derive(Debug)]
pub struct LineReassembler {
    buffer: Vec<u8>,
    /// Start of the unconsumed region of `buffer`.
    start: usize,
    /// Offset up to which the unconsumed region is known to contain no newline.
    scanned: usize,
    /// Number of newline-terminated lines consumed so far, blank ones included.
    line_number: usize,
    max_line_bytes: usize,
}

impl Default for LineReassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineReassembler {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            start: 0,
            scanned: 0,
            line_number: 0,
            max_line_bytes,
        }
    }

    /// Buffer a chunk without extracting lines. Pair with [`next_line`](Self::next_line).
    pub fn push(&mut self, chunk: &[u8]) {
        self.compact();
        self.buffer.extend_from_slice(chunk);
    }

    /// Pop the next complete, non-blank line.
    ///
    /// Returns `None` once only an unterminated fragment remains. Fails if a
    /// line is not valid UTF-8 or a line (or the fragment) outgrows the
    /// configured limit.
    pub fn next_line(&mut self) -> Option<Result<String, DecodeError>> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
                self.scanned = self.buffer.len();
                if self.pending_bytes() > self.max_line_bytes {
                    return Some(Err(DecodeError::LineTooLong {
                        limit: self.max_line_bytes,
                    }));
                }
                return None;
            };
            let start = self.start;
            let end = self.scanned + offset;
            self.start = end + 1;
            self.scanned = self.start;
            self.line_number += 1;

            if end - start > self.max_line_bytes {
                return Some(Err(DecodeError::LineTooLong {
                    limit: self.max_line_bytes,
                }));
            }
            match self.decode(&self.buffer[start..end]) {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Buffer a chunk and return every line it completes, in order.
    pub fn append(&mut self, chunk: &[u8]) -> Result<Vec<String>, DecodeError> {
        self.push(chunk);
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line?);
        }
        Ok(lines)
    }

    /// Flush the trailing fragment as if the stream ended with a newline.
    pub fn finalize(&mut self) -> Result<Option<String>, DecodeError> {
        self.compact();
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let raw = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        self.line_number += 1;
        if raw.len() > self.max_line_bytes {
            return Err(DecodeError::LineTooLong {
                limit: self.max_line_bytes,
            });
        }
        self.decode(&raw)
    }

    /// Size of the unterminated fragment currently held.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len() - self.start
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Drop consumed bytes from the front of the buffer in one move.
    fn compact(&mut self) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
    }

    /// Decode one raw line; blank lines map to `None`.
    fn decode(&self, raw: &[u8]) -> Result<Option<String>, DecodeError> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let text = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8 {
            line_number: self.line_number,
        })?;
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_owned()))
        }
    }
}
