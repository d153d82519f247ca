//! Bounded network transport.
//!
//! Every outbound request goes through [`BoundedTransport`], which races the
//! request against a deadline and a cancellation token:
//! - the deadline (15 s by default) fails the call with [`FetchError::Timeout`]
//! - a caller-supplied token fails it with [`FetchError::Aborted`]
//! - the losing future is dropped, which aborts the underlying request

mod bounded;
mod error;
mod request;
mod transport;

pub use bounded::{BoundedTransport, DEFAULT_TIMEOUT};
pub use error::{FetchError, FetchErrorKind, FetchResult};
pub use request::{HttpRequest, HttpResponse, Method};
pub use transport::{ReqwestTransport, Transport};

pub use tokio_util::sync::CancellationToken;
