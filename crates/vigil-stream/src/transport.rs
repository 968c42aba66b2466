//! `reqwest` adapter: turns an HTTP response into a followed execution.
//!
//! Building and sending the request (URL layout, authentication headers)
//! stays with the caller; this module only interprets the response.

use futures::Stream;
use reqwest::{Response, StatusCode};
use tracing::{info, warn};

use vigil_core::config::StreamConfig;
use vigil_core::error::{Result, TransportError};
use vigil_core::request::ExecuteResponse;

use crate::dispatch::ExecutionHooks;
use crate::driver::{execution_updates, follow, ExecutionUpdate};
use crate::tracker::StreamOutcome;

/// Map a non-success status and its body to a [`TransportError`].
pub fn map_status_error(status: StatusCode, body: String) -> TransportError {
    match status.as_u16() {
        401 | 403 => TransportError::Auth(body),
        code => TransportError::Status { status: code, body },
    }
}

/// Pass a successful response through; read the body of any other.
pub async fn ensure_success(response: Response) -> std::result::Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read response body".into());
    warn!(status = status.as_u16(), "Execution request rejected");
    Err(map_status_error(status, body))
}

/// Follow a streaming execute response to the end.
pub async fn follow_response<H>(
    response: Response,
    config: StreamConfig,
    hooks: H,
) -> Result<StreamOutcome>
where
    H: ExecutionHooks,
{
    let response = ensure_success(response).await?;
    info!(run_id = %config.run_id, url = %response.url(), "Following execution stream");
    follow(response.bytes_stream(), config, hooks).await
}

/// Stream [`ExecutionUpdate`]s from a streaming execute response.
pub async fn response_updates(
    response: Response,
    config: StreamConfig,
) -> Result<impl Stream<Item = Result<ExecutionUpdate>>> {
    let response = ensure_success(response).await?;
    Ok(execution_updates(response.bytes_stream(), config))
}

/// Read the acknowledgement returned by a non-streaming execute request.
pub async fn read_execute_response(response: Response) -> Result<ExecuteResponse> {
    let response = ensure_success(response).await?;
    let body = response
        .text()
        .await
        .map_err(|e| TransportError::Interrupted(e.to_string()))?;
    let ack: ExecuteResponse = serde_json::from_str(&body)
        .map_err(|e| TransportError::InvalidResponse(format!("{e}: {body}")))?;
    info!(execution_id = %ack.execution_id, status = %ack.status, "Execution accepted");
    Ok(ack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_status_error_auth() {
        let err = map_status_error(StatusCode::UNAUTHORIZED, "bad key".into());
        assert!(matches!(err, TransportError::Auth(msg) if msg == "bad key"));
    }

    #[test]
    fn map_status_error_forbidden() {
        let err = map_status_error(StatusCode::FORBIDDEN, "no access".into());
        assert!(matches!(err, TransportError::Auth(_)));
    }

    #[test]
    fn map_status_error_rate_limited() {
        let err = map_status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        assert!(matches!(err, TransportError::Status { status: 429, .. }));
    }

    #[test]
    fn map_status_error_server_error() {
        let err = map_status_error(StatusCode::INTERNAL_SERVER_ERROR, "oops".into());
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("oops"));
    }
}
