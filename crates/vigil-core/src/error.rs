use thiserror::Error;

/// Top-level error type for the Vigil library.
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Byte- and line-framing failures while reassembling the event stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("line {line_number} is not valid UTF-8")]
    InvalidUtf8 { line_number: usize },

    #[error("line is not valid JSON ({message}): {line}")]
    InvalidJson { line: String, message: String },

    #[error("pending line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

/// Failures that abort reconstruction of a single execution stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Malformed event ({reason}): {line}")]
    MalformedEvent { line: String, reason: String },

    #[error("'{op}' event received before 'init'")]
    Sequence { op: String },

    #[error("stream already failed; no further input is accepted")]
    Poisoned,
}

/// Failures reported by the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl StreamError {
    /// Returns `true` for errors raised while framing or decoding a line.
    pub fn is_decode(&self) -> bool {
        matches!(self, StreamError::Decode(_) | StreamError::MalformedEvent { .. })
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;
