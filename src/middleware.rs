//! Middleware installation and chain dispatch
//!
//! [`tamper`] builds the response-tampering middleware from a decision
//! callback. [`Chain`] is a minimal chain-of-responsibility dispatcher so
//! the middleware can be embedded and exercised without a hosting framework;
//! real frameworks own their own dispatch and only need to honor the
//! [`Middleware`] contract.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use http::{request, Request};
use tracing::debug;

use crate::decision::Decide;
use crate::error::TamperError;
use crate::interceptor::Interceptor;
use crate::writer::BoxWriter;

/// One unit in the request-handling chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handle the request or delegate onward via `next`. Implementations
    /// that install hooks must still invoke `next` right away rather than
    /// deferring dispatch.
    async fn handle(
        &self,
        req: Arc<request::Parts>,
        writer: BoxWriter,
        next: Next<'_>,
    ) -> Result<(), TamperError>;
}

/// Terminal request handler at the end of a chain.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, req: Arc<request::Parts>, writer: BoxWriter) -> Result<(), TamperError>;
}

#[async_trait]
impl<F, Fut> Endpoint for F
where
    F: Fn(Arc<request::Parts>, BoxWriter) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TamperError>> + Send,
{
    async fn call(&self, req: Arc<request::Parts>, writer: BoxWriter) -> Result<(), TamperError> {
        self(req, writer).await
    }
}

/// Continuation passed to each middleware.
pub struct Next<'a> {
    middlewares: &'a [Box<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl Next<'_> {
    /// Pass control to the rest of the chain.
    pub async fn run(self, req: Arc<request::Parts>, writer: BoxWriter) -> Result<(), TamperError> {
        match self.middlewares.split_first() {
            Some((middleware, rest)) => {
                let next = Next {
                    middlewares: rest,
                    endpoint: self.endpoint,
                };
                middleware.handle(req, writer, next).await
            }
            None => self.endpoint.call(req, writer).await,
        }
    }
}

/// Ordered middleware chain ending in an endpoint.
pub struct Chain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Append a middleware; earlier additions run first.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// Dispatch one request/response pair through the chain. The request
    /// body is not consumed by this crate and is dropped here.
    pub async fn dispatch<B>(
        &self,
        req: Request<B>,
        writer: BoxWriter,
        endpoint: &dyn Endpoint,
    ) -> Result<(), TamperError> {
        let (parts, _body) = req.into_parts();
        let next = Next {
            middlewares: &self.middlewares,
            endpoint,
        };
        next.run(Arc::new(parts), writer).await
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// Response-tampering middleware holding the decision callback.
pub struct Tamper {
    decide: Arc<dyn Decide>,
}

/// Build the middleware from a decision callback.
///
/// The callback runs once per response, at header-finalization time, and
/// returns a [`Verdict`](crate::Verdict): pass the response through
/// untouched, or buffer the whole body and rewrite it.
pub fn tamper<D: Decide + 'static>(decide: D) -> Tamper {
    Tamper {
        decide: Arc::new(decide),
    }
}

#[async_trait]
impl Middleware for Tamper {
    async fn handle(
        &self,
        req: Arc<request::Parts>,
        writer: BoxWriter,
        next: Next<'_>,
    ) -> Result<(), TamperError> {
        debug!(uri = %req.uri, "installing response hooks");
        let hooked = Interceptor::new(writer, Arc::clone(&req), Arc::clone(&self.decide));
        next.run(req, Box::new(hooked)).await
    }
}
