//! Underlying request-issuing primitive.

use crate::{FetchError, FetchResult, HttpRequest, HttpResponse, Method};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Something that can issue a single HTTP request.
///
/// Implementations should stop work once `cancel` fires. Dropping the
/// returned future must also abort the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest, cancel: CancellationToken)
        -> FetchResult<HttpResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn execute(&self, request: HttpRequest) -> FetchResult<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> FetchResult<HttpResponse> {
        let url = request.url.clone();
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(url = %url, "Request cancelled before completion");
                Err(FetchError::Aborted)
            }
            result = self.execute(request) => result,
        }
    }
}
