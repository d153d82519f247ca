//! Scripted transport for gateway tests.

use crate::SupabaseClient;
use async_trait::async_trait;
use bounded_fetch::{
    BoundedTransport, CancellationToken, FetchError, FetchResult, HttpRequest, HttpResponse,
    Transport,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Default)]
struct Script {
    responses: VecDeque<FetchResult<HttpResponse>>,
    requests: Vec<HttpRequest>,
}

/// Replays scripted responses in order and records every request.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    script: Arc<Mutex<Script>>,
}

impl RecordingTransport {
    pub(crate) fn new(responses: Vec<FetchResult<HttpResponse>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                responses: responses.into(),
                requests: Vec::new(),
            })),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().requests.clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.script.lock().requests.len()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.script
            .lock()
            .requests
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        request: HttpRequest,
        _cancel: CancellationToken,
    ) -> FetchResult<HttpResponse> {
        let mut script = self.script.lock();
        script.requests.push(request);
        script
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("no scripted response".to_string())))
    }
}

pub(crate) fn client_with(
    responses: Vec<FetchResult<HttpResponse>>,
) -> (SupabaseClient<RecordingTransport>, RecordingTransport) {
    let transport = RecordingTransport::new(responses);
    let client = SupabaseClient::new(
        "https://abc.supabase.co/",
        "anon-key",
        BoundedTransport::new(transport.clone()),
    );
    (client, transport)
}

/// Token endpoint body for `user_id`, valid for an hour.
pub(crate) fn token_body(user_id: &str, refresh_token: &str) -> String {
    serde_json::json!({
        "access_token": format!("access-{}", user_id),
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": Utc::now().timestamp() + 3600,
        "refresh_token": refresh_token,
        "user": {
            "id": user_id,
            "email": format!("{}@example.com", user_id),
            "user_metadata": {}
        }
    })
    .to_string()
}
