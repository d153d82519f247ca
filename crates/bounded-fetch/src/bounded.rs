//! Deadline and cancellation wrapper around a [`Transport`].

use crate::{FetchError, FetchResult, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default deadline for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Transport wrapper enforcing a hard deadline on every call.
///
/// Each call gets its own internal cancellation token, derived from the
/// caller's token when one is supplied. Caller cancellation propagates into
/// the internal token; a timeout cancels only the internal token.
pub struct BoundedTransport<T = ReqwestTransport> {
    inner: T,
    timeout: Duration,
}

impl<T: Transport> BoundedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self::with_timeout(inner, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Issue `request`, failing with [`FetchError::Timeout`] once the deadline
    /// passes or [`FetchError::Aborted`] once `signal` fires.
    ///
    /// A signal that is already cancelled fails the call without issuing the
    /// request. The deadline timer and the losing request future are dropped
    /// before this returns, on every path.
    pub async fn fetch(
        &self,
        request: HttpRequest,
        signal: Option<&CancellationToken>,
    ) -> FetchResult<HttpResponse> {
        let controller = match signal {
            Some(signal) => signal.child_token(),
            None => CancellationToken::new(),
        };

        if controller.is_cancelled() {
            debug!(url = %request.url, "Signal already cancelled, request not issued");
            return Err(FetchError::Aborted);
        }

        let url = request.url.clone();
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        tokio::select! {
            biased;
            _ = controller.cancelled() => Err(FetchError::Aborted),
            result = self.inner.send(request, controller.clone()) => result,
            _ = &mut deadline => {
                controller.cancel();
                let after_ms = self.timeout.as_millis() as u64;
                warn!(url = %url, after_ms, "Request timed out");
                Err(FetchError::Timeout { after_ms })
            }
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for BoundedTransport<T> {
    async fn send(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> FetchResult<HttpResponse> {
        self.fetch(request, Some(&cancel)).await
    }
}
