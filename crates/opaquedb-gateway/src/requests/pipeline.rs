//! Decode, decrypt, handle, encrypt, respond.

use crate::requests::{HandlerError, PrivateToken, ProcessError, RequestHandler};
use axum::http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_codec::{
    BinarySerializer, BinaryUnserializer, BufferPool, CodecError, Decryptor, Encryptor,
    JsonSerializer, JsonUnserializer, SecretKey,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

/// The codec half of a route: a matched encryptor/decryptor pair plus the
/// state factory used as the decryption target.
///
/// One pipeline is shared by every route that round-trips the same state
/// type; the encoding is fixed at construction and never mixed within a
/// token lineage.
pub struct EncryptedRequestPipeline<S, R> {
    encryptor: Encryptor<S>,
    decryptor: Decryptor<S>,
    new_state: Box<dyn Fn() -> S + Send + Sync>,
    _marker: PhantomData<fn(&R)>,
}

impl<S, R> EncryptedRequestPipeline<S, R>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    R: DeserializeOwned + PrivateToken + Send + 'static,
{
    /// Build a pipeline using the JSON token encoding.
    pub fn json<F>(key: &SecretKey, pool: BufferPool, new_state: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self {
            encryptor: Encryptor::new(Box::new(JsonSerializer::new(pool)), key),
            decryptor: Decryptor::new(Box::new(JsonUnserializer::new()), key),
            new_state: Box::new(new_state),
            _marker: PhantomData,
        }
    }

    /// Build a pipeline using the compact binary token encoding.
    ///
    /// `name` registers the state type for the encoding; reusing a name
    /// for a different type fails here instead of at decode time.
    pub fn binary<F>(
        name: &str,
        key: &SecretKey,
        pool: BufferPool,
        new_state: F,
    ) -> Result<Self, CodecError>
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        Ok(Self {
            encryptor: Encryptor::new(Box::new(BinarySerializer::<S>::new(name, pool)?), key),
            decryptor: Decryptor::new(Box::new(BinaryUnserializer::<S>::new(name)?), key),
            new_state: Box::new(new_state),
            _marker: PhantomData,
        })
    }

    /// Decode request bytes into `R`.
    pub fn decode_request(&self, body: &[u8]) -> Result<R, ProcessError> {
        serde_json::from_slice(body).map_err(ProcessError::BadBody)
    }

    /// Decrypt a private token into a fresh state value.
    pub fn decrypt_state(&self, token: &str) -> Result<S, ProcessError> {
        let mut state = (self.new_state)();
        self.decryptor.decrypt(token, &mut state).map_err(|e| {
            // The specific cause stays in the log; clients only learn
            // that decryption failed.
            warn!(cause = %e, "failed to decrypt private state");
            ProcessError::DecryptionFailed(e)
        })?;
        Ok(state)
    }

    /// Seal a state into a private token string.
    pub fn encrypt_state(&self, state: &S) -> Result<String, ProcessError> {
        self.encryptor.encrypt(state).map_err(|e| {
            warn!(cause = %e, "failed to encrypt state");
            ProcessError::EncryptionFailed(e)
        })
    }

    /// Bind a handler, producing a route builder. The pipeline is shared,
    /// so routes over the same state type clone one `Arc`.
    pub fn handle_with<D>(
        self: Arc<Self>,
        handler: Arc<dyn RequestHandler<S, R>>,
    ) -> Route<S, R, D> {
        Route {
            pipeline: self,
            handler,
            responder: None,
            methods: Vec::new(),
        }
    }
}

/// A responder assembles the public DTO from the final state and its
/// freshly sealed token.
pub type Responder<S, D> = Arc<dyn Fn(&S, String) -> D + Send + Sync>;

/// One bound route: pipeline + handler + responder + allowed methods.
pub struct Route<S, R, D> {
    pipeline: Arc<EncryptedRequestPipeline<S, R>>,
    handler: Arc<dyn RequestHandler<S, R>>,
    responder: Option<Responder<S, D>>,
    methods: Vec<Method>,
}

impl<S, R, D> Route<S, R, D>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    R: DeserializeOwned + PrivateToken + Send + 'static,
    D: Default,
{
    /// Configure the response DTO builder.
    #[must_use]
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&S, String) -> D + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Configure which HTTP methods the route accepts.
    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods.extend(methods);
        self
    }

    /// Allowed HTTP methods.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Run one request through decode, decrypt, handle, encrypt, respond.
    pub async fn process_bytes(&self, body: &[u8]) -> Result<D, ProcessError> {
        let request = self.pipeline.decode_request(body)?;

        let state = match request.private_token() {
            Some(token) if !token.is_empty() => Some(self.pipeline.decrypt_state(token)?),
            _ => None,
        };

        let state = self
            .handler
            .handle(request, state)
            .await
            .map_err(|e| match e {
                HandlerError::MissingState => ProcessError::BadPrivateBody,
                HandlerError::Logic(msg) => ProcessError::Compute(msg),
            })?;

        let token = self.pipeline.encrypt_state(&state)?;

        Ok(match &self.responder {
            Some(responder) => responder(&state, token),
            None => D::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::ComputeRequest;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct CounterState {
        count: u64,
    }

    #[derive(Debug, Default, Serialize)]
    struct CounterDto {
        count: u64,
        private: String,
    }

    struct Increment;

    #[async_trait]
    impl RequestHandler<CounterState, ComputeRequest> for Increment {
        async fn handle(
            &self,
            _request: ComputeRequest,
            state: Option<CounterState>,
        ) -> Result<CounterState, HandlerError> {
            let mut state = state.unwrap_or_default();
            state.count += 1;
            Ok(state)
        }
    }

    struct RequireState;

    #[async_trait]
    impl RequestHandler<CounterState, ComputeRequest> for RequireState {
        async fn handle(
            &self,
            _request: ComputeRequest,
            state: Option<CounterState>,
        ) -> Result<CounterState, HandlerError> {
            state.ok_or(HandlerError::MissingState)
        }
    }

    fn pipeline() -> Arc<EncryptedRequestPipeline<CounterState, ComputeRequest>> {
        let key = SecretKey::from_bytes(&[3u8; 32]).unwrap();
        Arc::new(EncryptedRequestPipeline::json(
            &key,
            BufferPool::new(),
            CounterState::default,
        ))
    }

    fn route(
        pipeline: &Arc<EncryptedRequestPipeline<CounterState, ComputeRequest>>,
    ) -> Route<CounterState, ComputeRequest, CounterDto> {
        Arc::clone(pipeline)
            .handle_with(Arc::new(Increment))
            .with_responder(|state: &CounterState, private| CounterDto {
                count: state.count,
                private,
            })
            .with_methods([Method::GET, Method::POST])
    }

    #[tokio::test]
    async fn test_fresh_request_runs_handler_on_empty_state() {
        let pipeline = pipeline();
        let dto = route(&pipeline).process_bytes(b"{}").await.unwrap();
        assert_eq!(dto.count, 1);
        assert!(!dto.private.is_empty());
    }

    #[tokio::test]
    async fn test_token_carries_state_between_requests() {
        let pipeline = pipeline();
        let route = route(&pipeline);

        let first = route.process_bytes(b"{}").await.unwrap();
        let body = format!(r#"{{"private": "{}"}}"#, first.private);
        let second = route.process_bytes(body.as_bytes()).await.unwrap();
        assert_eq!(second.count, 2);
        assert_ne!(second.private, first.private);
    }

    #[tokio::test]
    async fn test_bad_body() {
        let pipeline = pipeline();
        let err = route(&pipeline).process_bytes(b"not json").await.unwrap_err();
        assert!(matches!(err, ProcessError::BadBody(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_decryption_failure() {
        let pipeline = pipeline();
        let err = route(&pipeline)
            .process_bytes(br#"{"private": "AAAABBBBCCCCDDDDEEEEFFFF"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::DecryptionFailed(_)));
    }

    #[tokio::test]
    async fn test_empty_token_string_counts_as_absent() {
        let pipeline = pipeline();
        let dto = route(&pipeline)
            .process_bytes(br#"{"private": ""}"#)
            .await
            .unwrap();
        assert_eq!(dto.count, 1);
    }

    #[tokio::test]
    async fn test_missing_state_maps_to_bad_private_body() {
        let pipeline = pipeline();
        let route: Route<_, _, CounterDto> = pipeline.handle_with(Arc::new(RequireState));
        let err = route.process_bytes(b"{}").await.unwrap_err();
        assert!(matches!(err, ProcessError::BadPrivateBody));
    }

    #[tokio::test]
    async fn test_no_responder_returns_default() {
        let pipeline = pipeline();
        let route: Route<_, _, CounterDto> = pipeline.handle_with(Arc::new(Increment));
        let dto = route.process_bytes(b"{}").await.unwrap();
        assert_eq!(dto.count, 0);
        assert!(dto.private.is_empty());
    }
}
