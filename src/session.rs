//! Per-response interception state
//!
//! One [`Session`] exists per response, owned exclusively by its interceptor.
//! It tracks the captured head, the decision, and the ordered body buffer.
//! Nothing here is shared across requests and nothing is reused.

use bytes::{Bytes, BytesMut};
use http::StatusCode;

use crate::decision::Transform;

/// How the response is being handled. Leaves `Unresolved` exactly once, as a
/// side effect of the first (explicit or implicit) head finalization.
pub(crate) enum Decision {
    /// Headers not finalized yet; no body call has been processed.
    Unresolved,
    /// Transparent: everything forwards to the inner writer as it happens.
    Bypass,
    /// Buffering: body fragments are captured for the held transform.
    Tamper(Box<dyn Transform>),
    /// The response has ended; the wrapper forwards unconditionally.
    Finalized,
}

impl Decision {
    pub(crate) fn is_tamper(&self) -> bool {
        matches!(self, Decision::Tamper(_))
    }
}

/// Mutable state for a single response.
pub(crate) struct Session {
    pub(crate) headers_finalized: bool,
    pub(crate) status: StatusCode,
    pub(crate) reason: Option<String>,
    pub(crate) decision: Decision,
    buffered: Vec<Bytes>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            headers_finalized: false,
            status: StatusCode::OK,
            reason: None,
            decision: Decision::Unresolved,
            buffered: Vec::new(),
        }
    }

    /// Append a body fragment, preserving call order.
    pub(crate) fn push(&mut self, chunk: Bytes) {
        self.buffered.push(chunk);
    }

    pub(crate) fn buffered_bytes(&self) -> usize {
        self.buffered.iter().map(Bytes::len).sum()
    }

    /// Concatenate everything buffered so far into one body string.
    /// Non-UTF-8 sequences are replaced, not rejected.
    pub(crate) fn take_body(&mut self) -> String {
        let mut all = BytesMut::with_capacity(self.buffered_bytes());
        for chunk in self.buffered.drain(..) {
            all.extend_from_slice(&chunk);
        }
        String::from_utf8_lossy(&all).into_owned()
    }
}
