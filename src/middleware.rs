//! Tower layer adapting the gate to middleware stacks
//!
//! Wraps an inner service so every request passes [`KmsGate::authenticate`]
//! first. Allowed requests reach the inner service carrying the verified
//! identity in their extensions; rejected requests resolve with the
//! classified error for the surrounding stack to render (see
//! [`crate::error::ErrorResponse`]).

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::Request;
use tower::{Layer, Service};

use crate::error::KmsGateError;
use crate::gate::KmsGate;
use crate::verifier::VerifyToken;

/// Authentication layer for Tower.
pub struct KmsGateLayer<V: VerifyToken> {
    gate: KmsGate<V>,
}

impl<V: VerifyToken> KmsGateLayer<V> {
    /// Creates a layer around a shared verifier.
    pub fn new(verifier: Arc<V>) -> Self {
        Self {
            gate: KmsGate::new(verifier),
        }
    }
}

impl<V: VerifyToken> Clone for KmsGateLayer<V> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
        }
    }
}

impl<S, V: VerifyToken> Layer<S> for KmsGateLayer<V> {
    type Service = KmsGateService<S, V>;

    fn layer(&self, inner: S) -> Self::Service {
        KmsGateService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Service wrapper that authenticates before delegating.
pub struct KmsGateService<S, V: VerifyToken> {
    inner: S,
    gate: KmsGate<V>,
}

impl<S: Clone, V: VerifyToken> Clone for KmsGateService<S, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<S, V, B> Service<Request<B>> for KmsGateService<S, V>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<KmsGateError> + Send + 'static,
    S::Future: Send + 'static,
    V: VerifyToken + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = KmsGateError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let gate = self.gate.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            gate.authenticate(&mut req).await?;
            inner.call(req).await.map_err(Into::into)
        })
    }
}
