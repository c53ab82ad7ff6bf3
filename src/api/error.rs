//! Error types shared by the backend HTTP client.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`ApiError`] failures.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures that can occur while talking to the hunt backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build backend client")]
    ClientBuilder {
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent at all (no response).
    #[error("failed to send request to `{path}`")]
    RequestSend {
        /// Endpoint path the request targeted.
        path: String,
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("backend returned status {status} for `{path}`")]
    Status {
        /// Endpoint path the request targeted.
        path: String,
        /// HTTP status of the response.
        status: StatusCode,
        /// Free-text `detail` from the failure body, when present.
        detail: Option<String>,
        /// Structured `error_kind` from the failure body, when present.
        error_kind: Option<String>,
    },
    /// A success response body could not be parsed.
    #[error("failed to decode response from `{path}`")]
    DecodeResponse {
        /// Endpoint path the request targeted.
        path: String,
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
}
