//! Response interceptor - the write/finalize hijacking decorator
//!
//! [`Interceptor`] wraps a [`ResponseWriter`] and drives the per-response
//! state machine: capture the head on the first finalize call, ask the
//! decision callback whether to tamper, then either pass every call through
//! untouched or buffer the whole body, rewrite it and replay a single
//! corrected end.

use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, request, HeaderMap, HeaderName, HeaderValue, StatusCode};
use tracing::{debug, trace};

use crate::decision::{Decide, ResponseHead, TransformContext, Verdict};
use crate::error::TamperError;
use crate::session::{Decision, Session};
use crate::writer::ResponseWriter;

/// Decorator implementing [`ResponseWriter`] over the real writer.
///
/// One interceptor serves exactly one response and is discarded with it.
/// Wrapping the same response twice, or calling write/end after the tampered
/// end has completed, is caller misuse; after finalization the interceptor
/// behaves as a plain pass-through.
pub struct Interceptor<W> {
    inner: W,
    request: Arc<request::Parts>,
    decide: Arc<dyn Decide>,
    session: Session,
}

impl<W: ResponseWriter> Interceptor<W> {
    /// Hook the given writer. The decision callback fires on the first
    /// explicit or implicit head finalization.
    pub fn new(inner: W, request: Arc<request::Parts>, decide: Arc<dyn Decide>) -> Self {
        Self {
            inner,
            request,
            decide,
            session: Session::new(),
        }
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// The transport defaults the head on the first body call; mirror that
    /// by finalizing with the writer's current status before write/end.
    fn ensure_headers(&mut self) -> Result<(), TamperError> {
        if !self.session.headers_finalized {
            let status = self.inner.status();
            self.write_head(status, None, None)?;
        }
        Ok(())
    }
}

#[async_trait]
impl<W: ResponseWriter> ResponseWriter for Interceptor<W> {
    fn status(&self) -> StatusCode {
        self.inner.status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.inner.set_status(status)
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.insert_header(name, value)
    }

    fn write_head(
        &mut self,
        status: StatusCode,
        reason: Option<&str>,
        headers: Option<HeaderMap>,
    ) -> Result<(), TamperError> {
        if self.session.headers_finalized {
            // The hook fires once; later calls go straight through.
            return self.inner.write_head(status, reason, headers);
        }

        self.session.status = status;
        self.session.reason = reason.map(str::to_owned);
        self.inner.set_status(status);

        // Stage the header map entries so the decision callback sees them.
        if let Some(headers) = headers {
            let mut last_name = None;
            for (name, value) in headers {
                if name.is_some() {
                    last_name = name;
                }
                if let Some(name) = &last_name {
                    self.inner.insert_header(name.clone(), value);
                }
            }
        }
        self.session.headers_finalized = true;

        let verdict = {
            let mut head =
                ResponseHead::new(status, self.session.reason.as_deref(), &mut self.inner);
            self.decide.decide(&self.request, &mut head)
        };

        match verdict {
            Verdict::Pass => {
                debug!(status = status.as_u16(), "bypassing response");
                self.session.decision = Decision::Bypass;
                // Re-issue the head the transport would have seen without us.
                self.inner
                    .write_head(status, self.session.reason.as_deref(), None)
            }
            Verdict::Tamper(transform) => {
                debug!(status = status.as_u16(), "tampering, buffering body");
                self.session.decision = Decision::Tamper(transform);
                Ok(())
            }
        }
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), TamperError> {
        self.ensure_headers()?;
        if self.session.decision.is_tamper() {
            trace!(len = chunk.len(), "buffering chunk");
            self.session.push(chunk);
            Ok(())
        } else {
            self.inner.write(chunk).await
        }
    }

    async fn end(&mut self, chunk: Option<Bytes>) -> Result<(), TamperError> {
        self.ensure_headers()?;

        // End is terminal on every path; a bypassed session simply collapses
        // into the finalized pass-through state.
        match mem::replace(&mut self.session.decision, Decision::Finalized) {
            Decision::Tamper(transform) => {
                if let Some(chunk) = chunk {
                    self.session.push(chunk);
                }
                let body = self.session.take_body();
                debug!(buffered = body.len(), "applying transform");

                let body = transform
                    .apply(
                        body,
                        TransformContext {
                            request: &self.request,
                            headers: self.inner.headers(),
                        },
                    )
                    .await;
                debug!(resolved = body.len(), "transform resolved, replaying");

                self.inner
                    .insert_header(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
                self.inner
                    .write_head(self.session.status, self.session.reason.as_deref(), None)?;
                self.inner.end(Some(Bytes::from(body))).await
            }
            _ => self.inner.end(chunk).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    #[derive(Debug, PartialEq)]
    enum Event {
        Head {
            status: u16,
            reason: Option<String>,
            headers: HeaderMap,
        },
        Chunk(Bytes),
        End(Option<Bytes>),
    }

    struct MockWriter {
        status: StatusCode,
        headers: HeaderMap,
        events: Vec<Event>,
    }

    impl MockWriter {
        fn new() -> Self {
            Self {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                events: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ResponseWriter for MockWriter {
        fn status(&self) -> StatusCode {
            self.status
        }

        fn set_status(&mut self, status: StatusCode) {
            self.status = status;
        }

        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
            self.headers.insert(name, value);
        }

        fn write_head(
            &mut self,
            status: StatusCode,
            reason: Option<&str>,
            headers: Option<HeaderMap>,
        ) -> Result<(), TamperError> {
            self.status = status;
            if let Some(extra) = headers {
                let mut last_name = None;
                for (name, value) in extra {
                    if name.is_some() {
                        last_name = name;
                    }
                    if let Some(name) = &last_name {
                        self.headers.insert(name.clone(), value);
                    }
                }
            }
            self.events.push(Event::Head {
                status: status.as_u16(),
                reason: reason.map(str::to_owned),
                headers: self.headers.clone(),
            });
            Ok(())
        }

        async fn write(&mut self, chunk: Bytes) -> Result<(), TamperError> {
            self.events.push(Event::Chunk(chunk));
            Ok(())
        }

        async fn end(&mut self, chunk: Option<Bytes>) -> Result<(), TamperError> {
            self.events.push(Event::End(chunk));
            Ok(())
        }
    }

    fn parts() -> Arc<request::Parts> {
        let (parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        Arc::new(parts)
    }

    fn pass(_req: &request::Parts, _res: &mut ResponseHead<'_>) -> Verdict {
        Verdict::Pass
    }

    fn uppercase(_req: &request::Parts, _res: &mut ResponseHead<'_>) -> Verdict {
        Verdict::tamper(|body| body.to_uppercase())
    }

    #[tokio::test]
    async fn bypass_forwards_every_call_in_order() {
        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(pass));
        hooked.write_head(StatusCode::OK, None, None).unwrap();
        hooked.write(Bytes::from_static(b"a")).await.unwrap();
        hooked.write(Bytes::from_static(b"b")).await.unwrap();
        hooked.end(Some(Bytes::from_static(b"c"))).await.unwrap();

        let inner = hooked.into_inner();
        assert_eq!(inner.events.len(), 4);
        assert!(matches!(inner.events[0], Event::Head { status: 200, .. }));
        assert_eq!(inner.events[1], Event::Chunk(Bytes::from_static(b"a")));
        assert_eq!(inner.events[2], Event::Chunk(Bytes::from_static(b"b")));
        assert_eq!(inner.events[3], Event::End(Some(Bytes::from_static(b"c"))));
    }

    #[tokio::test]
    async fn tamper_buffers_and_replays_a_single_corrected_end() {
        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(uppercase));
        hooked.write_head(StatusCode::OK, None, None).unwrap();
        hooked.write(Bytes::from_static(b"hello ")).await.unwrap();
        hooked.write(Bytes::from_static(b"wor")).await.unwrap();
        hooked.end(Some(Bytes::from_static(b"ld"))).await.unwrap();

        let inner = hooked.into_inner();
        assert_eq!(inner.events.len(), 2);
        match &inner.events[0] {
            Event::Head { status, headers, .. } => {
                assert_eq!(*status, 200);
                assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "11");
            }
            other => panic!("expected head, got {other:?}"),
        }
        assert_eq!(
            inner.events[1],
            Event::End(Some(Bytes::from_static(b"HELLO WORLD")))
        );
    }

    #[tokio::test]
    async fn implicit_finalize_uses_the_writers_current_status() {
        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(pass));
        hooked.set_status(StatusCode::NOT_FOUND);
        hooked.write(Bytes::from_static(b"missing")).await.unwrap();
        hooked.end(None).await.unwrap();

        let inner = hooked.into_inner();
        assert!(matches!(inner.events[0], Event::Head { status: 404, .. }));
        assert_eq!(inner.events[1], Event::Chunk(Bytes::from_static(b"missing")));
    }

    #[tokio::test]
    async fn end_alone_triggers_implicit_finalize_with_default_status() {
        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(pass));
        hooked.end(Some(Bytes::from_static(b"bye"))).await.unwrap();

        let inner = hooked.into_inner();
        assert!(matches!(inner.events[0], Event::Head { status: 200, .. }));
        assert_eq!(inner.events[1], Event::End(Some(Bytes::from_static(b"bye"))));
    }

    #[tokio::test]
    async fn later_write_head_calls_go_straight_through() {
        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(pass));
        hooked.write_head(StatusCode::OK, None, None).unwrap();
        hooked
            .write_head(StatusCode::INTERNAL_SERVER_ERROR, None, None)
            .unwrap();

        let inner = hooked.into_inner();
        assert!(matches!(inner.events[0], Event::Head { status: 200, .. }));
        assert!(matches!(inner.events[1], Event::Head { status: 500, .. }));
    }

    #[tokio::test]
    async fn reason_phrase_is_captured_and_replayed_on_tamper() {
        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(uppercase));
        hooked.write_head(StatusCode::OK, Some("Okay"), None).unwrap();
        hooked.end(Some(Bytes::from_static(b"hi"))).await.unwrap();

        let inner = hooked.into_inner();
        match &inner.events[0] {
            Event::Head { reason, .. } => assert_eq!(reason.as_deref(), Some("Okay")),
            other => panic!("expected head, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transform_on_empty_body_still_replays_framing() {
        fn fill(_req: &request::Parts, _res: &mut ResponseHead<'_>) -> Verdict {
            Verdict::tamper(|_| "generated".to_owned())
        }

        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(fill));
        hooked.write_head(StatusCode::OK, None, None).unwrap();
        hooked.end(None).await.unwrap();

        let inner = hooked.into_inner();
        match &inner.events[0] {
            Event::Head { headers, .. } => {
                assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "9");
            }
            other => panic!("expected head, got {other:?}"),
        }
        assert_eq!(
            inner.events[1],
            Event::End(Some(Bytes::from_static(b"generated")))
        );
    }

    #[tokio::test]
    async fn decision_sees_headers_staged_before_finalize() {
        fn pick(_req: &request::Parts, res: &mut ResponseHead<'_>) -> Verdict {
            if res.header("x-tamper") == Some("No") {
                Verdict::Pass
            } else {
                Verdict::tamper(|body| body.to_uppercase())
            }
        }

        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(pick));
        hooked.insert_header(
            HeaderName::from_static("x-tamper"),
            HeaderValue::from_static("No"),
        );
        hooked.write_head(StatusCode::OK, None, None).unwrap();
        hooked.end(Some(Bytes::from_static(b"raw"))).await.unwrap();

        let inner = hooked.into_inner();
        assert_eq!(inner.events[1], Event::End(Some(Bytes::from_static(b"raw"))));
    }

    #[tokio::test]
    async fn transform_context_carries_request_and_headers() {
        struct EchoPath;

        impl crate::decision::Transform for EchoPath {
            fn apply<'a>(
                self: Box<Self>,
                _body: String,
                ctx: TransformContext<'a>,
            ) -> crate::decision::BoxFuture<'a, String> {
                let path = ctx.request.uri.path().to_owned();
                Box::pin(std::future::ready(path))
            }
        }

        fn echo(_req: &request::Parts, _res: &mut ResponseHead<'_>) -> Verdict {
            Verdict::Tamper(Box::new(EchoPath))
        }

        let mut hooked = Interceptor::new(MockWriter::new(), parts(), Arc::new(echo));
        hooked.write_head(StatusCode::OK, None, None).unwrap();
        hooked.end(Some(Bytes::from_static(b"ignored"))).await.unwrap();

        let inner = hooked.into_inner();
        assert_eq!(inner.events[1], Event::End(Some(Bytes::from_static(b"/"))));
    }
}
