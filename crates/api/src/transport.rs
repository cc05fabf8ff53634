use crate::error::ApiError;
use crate::request::ApiRequest;
use crate::response::ApiResponse;

/// Executes API requests.
///
/// Implementations return `Ok` for every response the server produced,
/// including non-success statuses; `Err` is reserved for failures below the
/// API (connection, TLS, undecodable body). Callers decide how to treat the
/// status.
pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// Sends `request` and turns a non-success status into `RequestFailed`.
pub fn execute(transport: &dyn Transport, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    tracing::debug!(method = %request.method, path = %request.path, "Send");
    let response = transport.send(request)?;
    if !response.is_success() {
        tracing::warn!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "Request rejected"
        );
    }
    response.into_result()
}
