//! Response writer abstraction
//!
//! The transport underneath this crate is specified only through the
//! [`ResponseWriter`] trait: the set of outbound response primitives a
//! response object must expose. The interceptor decorates an implementation
//! of this trait rather than mutating it in place, so anything the
//! application did to the writer before interception began is unaffected.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::error::TamperError;

/// Low-level outbound response primitives.
///
/// Implementations must guarantee:
/// - `set_status`/`insert_header` stage values that are committed by
///   `write_head`; staged values stay readable via `status()`/`headers()`
///   until then.
/// - `write_head` commits the status line and header set; a second call is
///   transport-defined.
/// - The transport itself defaults the head on the first body call if
///   `write_head` was never invoked explicitly.
#[async_trait]
pub trait ResponseWriter: Send {
    /// Current staged or committed status code. Defaults to 200 before
    /// anything is set.
    fn status(&self) -> StatusCode;

    /// Stage a status code without committing it.
    fn set_status(&mut self, status: StatusCode);

    /// Headers staged or committed so far.
    fn headers(&self) -> &HeaderMap;

    /// Stage a header, replacing any previous value for the same name.
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Commit the status line and header set. `headers`, when given, is
    /// merged into the staged set first. `reason` overrides the default
    /// reason phrase for the status line.
    fn write_head(
        &mut self,
        status: StatusCode,
        reason: Option<&str>,
        headers: Option<HeaderMap>,
    ) -> Result<(), TamperError>;

    /// Send one body chunk.
    async fn write(&mut self, chunk: Bytes) -> Result<(), TamperError>;

    /// Terminate the body, optionally with a trailing chunk.
    async fn end(&mut self, chunk: Option<Bytes>) -> Result<(), TamperError>;
}

/// Boxed writer handed along the middleware chain.
pub type BoxWriter = Box<dyn ResponseWriter>;

#[async_trait]
impl<W: ResponseWriter + ?Sized> ResponseWriter for Box<W> {
    fn status(&self) -> StatusCode {
        (**self).status()
    }

    fn set_status(&mut self, status: StatusCode) {
        (**self).set_status(status)
    }

    fn headers(&self) -> &HeaderMap {
        (**self).headers()
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        (**self).insert_header(name, value)
    }

    fn write_head(
        &mut self,
        status: StatusCode,
        reason: Option<&str>,
        headers: Option<HeaderMap>,
    ) -> Result<(), TamperError> {
        (**self).write_head(status, reason, headers)
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), TamperError> {
        (**self).write(chunk).await
    }

    async fn end(&mut self, chunk: Option<Bytes>) -> Result<(), TamperError> {
        (**self).end(chunk).await
    }
}
