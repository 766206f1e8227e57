//! Decision and transform contracts
//!
//! A [`Decide`] implementation is consulted exactly once per response, at
//! header-finalization time, with read access to the request and to the
//! response head assembled so far. It returns a [`Verdict`]: leave the
//! response alone, or buffer the whole body and rewrite it with a
//! [`Transform`].

use std::future::Future;
use std::pin::Pin;

use http::header::AsHeaderName;
use http::{request, HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::writer::ResponseWriter;

/// Boxed future used for transform resolution.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of the decision callback.
pub enum Verdict {
    /// Leave the response alone; every call passes straight through.
    Pass,
    /// Buffer the full body and rewrite it with the given transform.
    Tamper(Box<dyn Transform>),
}

impl Verdict {
    /// Tamper with a synchronous full-body transform.
    pub fn tamper<F>(f: F) -> Self
    where
        F: FnOnce(String) -> String + Send + 'static,
    {
        Verdict::Tamper(Box::new(FnTransform(f)))
    }

    /// Tamper with a transform that resolves asynchronously.
    pub fn tamper_async<F, Fut>(f: F) -> Self
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        Verdict::Tamper(Box::new(AsyncFnTransform(f)))
    }
}

/// Full-body rewrite applied once the response has ended.
///
/// The result is always treated as asynchronous; a synchronous transform is
/// a future that happens to be ready immediately. Partial or streaming
/// rewrites are unsupported: the transform receives the whole buffered body
/// and must return the whole replacement body.
pub trait Transform: Send {
    fn apply<'a>(self: Box<Self>, body: String, ctx: TransformContext<'a>) -> BoxFuture<'a, String>;
}

/// Read-only context handed to a transform alongside the buffered body.
pub struct TransformContext<'a> {
    /// The request this response answers.
    pub request: &'a request::Parts,
    /// Headers staged on the response at transform time.
    pub headers: &'a HeaderMap,
}

struct FnTransform<F>(F);

impl<F> Transform for FnTransform<F>
where
    F: FnOnce(String) -> String + Send,
{
    fn apply<'a>(self: Box<Self>, body: String, _ctx: TransformContext<'a>) -> BoxFuture<'a, String> {
        Box::pin(std::future::ready((self.0)(body)))
    }
}

struct AsyncFnTransform<F>(F);

impl<F, Fut> Transform for AsyncFnTransform<F>
where
    F: FnOnce(String) -> Fut + Send,
    Fut: Future<Output = String> + Send + 'static,
{
    fn apply<'a>(self: Box<Self>, body: String, _ctx: TransformContext<'a>) -> BoxFuture<'a, String> {
        Box::pin((self.0)(body))
    }
}

/// Per-response decision, called exactly once when headers are finalized.
///
/// Plain functions and closures of the matching shape implement this trait.
pub trait Decide: Send + Sync {
    fn decide(&self, req: &request::Parts, res: &mut ResponseHead<'_>) -> Verdict;
}

impl<F> Decide for F
where
    F: Fn(&request::Parts, &mut ResponseHead<'_>) -> Verdict + Send + Sync,
{
    fn decide(&self, req: &request::Parts, res: &mut ResponseHead<'_>) -> Verdict {
        self(req, res)
    }
}

/// View of the response head offered to the decision callback.
///
/// Exposes the status and reason captured at finalize time plus every header
/// staged so far, including ones the application set before finalizing.
/// Headers added here are committed together with the rest of the head at
/// the deferred real finalize call.
pub struct ResponseHead<'a> {
    status: StatusCode,
    reason: Option<&'a str>,
    writer: &'a mut dyn ResponseWriter,
}

impl<'a> ResponseHead<'a> {
    pub(crate) fn new(
        status: StatusCode,
        reason: Option<&'a str>,
        writer: &'a mut dyn ResponseWriter,
    ) -> Self {
        Self {
            status,
            reason,
            writer,
        }
    }

    /// Status code captured at finalize time.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase, if the finalize call carried one.
    pub fn reason(&self) -> Option<&str> {
        self.reason
    }

    /// All headers staged so far.
    pub fn headers(&self) -> &HeaderMap {
        self.writer.headers()
    }

    /// Convenience lookup returning a header value as a string.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.writer.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Stage an additional header on the response.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.writer.insert_header(name, value);
    }
}
