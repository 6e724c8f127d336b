//! The generic encrypted request pipeline.

pub mod pipeline;
pub mod request;

pub use pipeline::{EncryptedRequestPipeline, Route};
pub use request::{ComputeRequest, PrivateToken};

use async_trait::async_trait;
use thiserror::Error;

/// Errors a route handler may return.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The route requires a prior state and the request carried no token.
    #[error("no private state provided")]
    MissingState,

    /// The handler's compute logic failed.
    #[error("compute logic failed: {0}")]
    Logic(String),
}

/// Errors from processing one request through the pipeline.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The body was not a decodable request.
    #[error("malformed request body")]
    BadBody(#[source] serde_json::Error),

    /// A required private token was absent.
    #[error("missing or invalid private state")]
    BadPrivateBody,

    /// The private token could not be opened. The specific cause is
    /// logged server-side and never surfaced to the client.
    #[error("failed to decrypt private state")]
    DecryptionFailed(#[source] shared_codec::CodecError),

    /// The outgoing state could not be sealed.
    #[error("failed to encrypt state")]
    EncryptionFailed(#[source] shared_codec::CodecError),

    /// The route handler failed.
    #[error("compute handler failed: {0}")]
    Compute(String),
}

/// A route's compute step.
///
/// `state` is `None` when the request carried no private token; whether
/// that is acceptable is the route's contract. The handler may suspend
/// (the long-poll route does) and returns the state to seal into the
/// response token.
#[async_trait]
pub trait RequestHandler<S, R>: Send + Sync {
    async fn handle(&self, request: R, state: Option<S>) -> Result<S, HandlerError>;
}
