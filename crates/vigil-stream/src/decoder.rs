use serde_json::Value;

use vigil_core::error::{DecodeError, StreamError};
use vigil_core::event::ExecutionEvent;

/// Decode one line of the event stream.
///
/// A line that is not JSON is a framing failure ([`DecodeError::InvalidJson`]).
/// Valid JSON with a missing or unknown `op`, or a body that does not fit
/// its declared `op`, is a [`StreamError::MalformedEvent`] carrying the line.
pub fn decode_event(line: &str) -> Result<ExecutionEvent, StreamError> {
    let value: Value = serde_json::from_str(line).map_err(|e| DecodeError::InvalidJson {
        line: line.to_owned(),
        message: e.to_string(),
    })?;

    match value.get("op") {
        Some(Value::String(op)) if ExecutionEvent::OPS.contains(&op.as_str()) => {}
        Some(Value::String(op)) => return Err(malformed(line, format!("unknown op '{op}'"))),
        Some(_) => return Err(malformed(line, "'op' is not a string".into())),
        None => return Err(malformed(line, "missing 'op' field".into())),
    }

    serde_json::from_value(value).map_err(|e| malformed(line, e.to_string()))
}

fn malformed(line: &str, reason: String) -> StreamError {
    StreamError::MalformedEvent {
        line: line.to_owned(),
        reason,
    }
}
