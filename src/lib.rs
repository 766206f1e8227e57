//! Tamper - Response-Tampering Middleware
//!
//! Tamper intercepts an outbound HTTP response before it reaches the
//! transport, gives a caller-supplied decision callback a look at the
//! response head (status, headers), and either lets every call pass straight
//! through or buffers the full body, rewrites it and re-emits it with
//! corrected framing (content-length, status line, headers).
//!
//! ## Features
//!
//! - **Transparent bypass**: when the decision declines, the transport sees
//!   the exact call sequence it would have seen with no middleware installed
//! - **Full-body rewrite**: all body fragments are buffered in call order and
//!   handed to the transform as one string
//! - **Sync or async transforms**: the transform result is always treated as
//!   a future; it may resolve immediately or on a later tick
//! - **Framing correction**: content-length is recomputed from the rewritten
//!   body before the deferred real finalize call
//!
//! ## Usage
//!
//! ```rust
//! use http::request;
//! use tamper::{tamper, Chain, ResponseHead, Verdict};
//!
//! fn upgrade_links(_req: &request::Parts, res: &mut ResponseHead<'_>) -> Verdict {
//!     if res.header("x-tamper") == Some("No") {
//!         return Verdict::Pass;
//!     }
//!     Verdict::tamper(|body| body.replace("http://", "https://"))
//! }
//!
//! let chain = Chain::new().with(tamper(upgrade_links));
//! # let _ = chain;
//! ```
//!
//! ## Architecture
//!
//! Tamper is a library meant to be embedded in a hosting framework that owns
//! the actual network I/O:
//!
//! - `writer` - the response-writer capability interface the transport honors
//! - `interceptor` - the decorator hijacking the write/finalize lifecycle
//! - `decision` - decision and transform contracts
//! - `middleware` - installation function and chain-of-responsibility dispatch
//!
//! The crate performs no I/O of its own and spawns no tasks; the only
//! suspension point is awaiting the transform's result.

pub mod decision;
pub mod error;
pub mod interceptor;
pub mod middleware;
mod session;
pub mod writer;

/// Decision and transform contracts
pub use decision::{BoxFuture, Decide, ResponseHead, Transform, TransformContext, Verdict};

/// Errors
pub use error::TamperError;

/// The write/finalize hijacking decorator
pub use interceptor::Interceptor;

/// Installation and chain dispatch
pub use middleware::{tamper, Chain, Endpoint, Middleware, Next, Tamper};

/// Transport-facing writer abstraction
pub use writer::{BoxWriter, ResponseWriter};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
