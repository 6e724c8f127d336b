//! Wire error codes and the HTTP error surface.

use crate::requests::ProcessError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Short machine-readable error codes.
///
/// Each code is defined here, once; an emitted code has exactly one
/// constructor below, so grep for a code string and you find its one
/// production site.
pub mod codes {
    pub const BAD_BODY: &str = "bad-body";
    pub const BAD_PRIVATE_BODY: &str = "bad-private-body";
    pub const DECRYPTION_FAILED: &str = "decryption-failed";
    pub const ENCRYPTION_FAILED: &str = "encryption-failed";
    /// Reserved wire code. Responses are serialized into a buffer before
    /// anything reaches the socket, so the only observable output failure
    /// is [`WRITING_BODY_FAILED`]; this server never emits it.
    pub const ENCODING_FAILED: &str = "encoding-failed";
    pub const WRITING_BODY_FAILED: &str = "writing-body-failed";
    pub const COMPUTE_LOGIC_ERROR: &str = "compute-logic-error";
}

/// An error response: a status and a short wire code.
///
/// The code is all a client sees; specifics stay in the server log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    pub code: &'static str,
    pub status: StatusCode,
}

impl ApiError {
    /// Malformed request body.
    #[must_use]
    pub fn bad_body() -> Self {
        Self {
            code: codes::BAD_BODY,
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// Missing or unusable private token where one is required.
    #[must_use]
    pub fn bad_private_body() -> Self {
        Self {
            code: codes::BAD_PRIVATE_BODY,
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// Token could not be opened. One code for every cause.
    #[must_use]
    pub fn decryption_failed() -> Self {
        Self {
            code: codes::DECRYPTION_FAILED,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Outgoing state could not be sealed.
    #[must_use]
    pub fn encryption_failed() -> Self {
        Self {
            code: codes::ENCRYPTION_FAILED,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The response body could not be produced.
    #[must_use]
    pub fn writing_body_failed() -> Self {
        Self {
            code: codes::WRITING_BODY_FAILED,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The route's compute handler failed.
    #[must_use]
    pub fn compute_logic_error() -> Self {
        Self {
            code: codes::COMPUTE_LOGIC_ERROR,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&ProcessError> for ApiError {
    fn from(err: &ProcessError) -> Self {
        match err {
            ProcessError::BadBody(_) => Self::bad_body(),
            ProcessError::BadPrivateBody => Self::bad_private_body(),
            ProcessError::DecryptionFailed(_) => Self::decryption_failed(),
            ProcessError::EncryptionFailed(_) => Self::encryption_failed(),
            ProcessError::Compute(_) => Self::compute_logic_error(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.code).into_response()
    }
}

/// Service-level failures outside the request path.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Serve(#[source] std::io::Error),
}
