//! Gmail REST client — threads.list and threads.get with bearer auth.
//!
//! Rate limiting: a 429 response is retried up to `MAX_RATE_LIMIT_RETRIES`
//! times, honoring `Retry-After` when present and doubling a capped backoff
//! otherwise. Anything else non-2xx fails the call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::provider::{MailProvider, MailboxCredentials, ProviderThread, ThreadStub};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
const MAX_RATE_LIMIT_RETRIES: u32 = 3;
const PROVIDER_NAME: &str = "gmail";

/// Gmail API client over plain HTTPS with a caller-supplied access token.
#[derive(Debug, Clone)]
pub struct GmailProvider {
    client: Client,
    base_url: String,
}

impl Default for GmailProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: GMAIL_API_BASE.to_string(),
        }
    }

    /// Point the client at a different base URL (local stub servers in
    /// tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_with_retry(
        &self,
        creds: &MailboxCredentials,
        url: &str,
    ) -> Result<String, ProviderError> {
        let mut backoff_seconds = 1u64;

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            let response = self
                .client
                .get(url)
                .bearer_auth(creds.access_token.expose_secret())
                .header("accept", "application/json")
                .send()
                .await
                .map_err(|e| ProviderError::Http(format!("{url}: {e}")))?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt == MAX_RATE_LIMIT_RETRIES {
                    return Err(ProviderError::RateLimited {
                        provider: PROVIDER_NAME.to_string(),
                        attempts: attempt + 1,
                    });
                }
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(backoff_seconds);
                warn!(url = %url, retry_after, "Gmail rate limited, backing off");
                sleep(Duration::from_secs(retry_after)).await;
                backoff_seconds = (backoff_seconds * 2).min(16);
                continue;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(ProviderError::AuthFailed {
                    provider: PROVIDER_NAME.to_string(),
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| ProviderError::Http(format!("read body: {e}")))?;

            if !status.is_success() {
                return Err(ProviderError::RequestFailed {
                    provider: PROVIDER_NAME.to_string(),
                    reason: format!("status {status} from {url}"),
                });
            }

            return Ok(body);
        }

        Err(ProviderError::RequestFailed {
            provider: PROVIDER_NAME.to_string(),
            reason: "request loop exited without a response".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ThreadListResponse {
    #[serde(default)]
    threads: Vec<ThreadStub>,
}

#[async_trait]
impl MailProvider for GmailProvider {
    async fn list_threads(
        &self,
        creds: &MailboxCredentials,
        max_results: u32,
    ) -> Result<Vec<ThreadStub>, ProviderError> {
        let url = format!(
            "{}/users/me/threads?maxResults={max_results}",
            self.base_url
        );
        let body = self.get_with_retry(creds, &url).await?;
        let list: ThreadListResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("thread list: {e}"),
            })?;

        debug!(count = list.threads.len(), "Listed gmail threads");
        Ok(list.threads)
    }

    async fn get_thread(
        &self,
        creds: &MailboxCredentials,
        thread_id: &str,
    ) -> Result<ProviderThread, ProviderError> {
        let url = format!(
            "{}/users/me/threads/{thread_id}?format=full",
            self.base_url
        );
        let body = self.get_with_retry(creds, &url).await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
            provider: PROVIDER_NAME.to_string(),
            reason: format!("thread {thread_id}: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::State;
    use axum::response::IntoResponse;
    use secrecy::SecretString;

    use super::*;

    #[derive(Clone)]
    struct StubState {
        hits: Arc<AtomicUsize>,
        rate_limited_responses: usize,
    }

    async fn threads_route(State(state): State<StubState>) -> axum::response::Response {
        let served = state.hits.fetch_add(1, Ordering::SeqCst);
        if served < state.rate_limited_responses {
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("retry-after", "0")],
                "slow down",
            )
                .into_response()
        } else {
            r#"{"threads":[{"id":"t1"},{"id":"t2"}]}"#.into_response()
        }
    }

    /// In-process HTTP server that answers 429 for the first
    /// `rate_limited_responses` requests, then 200.
    async fn spawn_stub(rate_limited_responses: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = axum::Router::new()
            .route("/users/me/threads", axum::routing::get(threads_route))
            .with_state(StubState {
                hits: Arc::clone(&hits),
                rate_limited_responses,
            });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{addr}"), hits)
    }

    fn creds() -> MailboxCredentials {
        MailboxCredentials {
            access_token: SecretString::from("tok"),
            mailbox_email: "me@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn rate_limited_request_retries_until_success() {
        let (base, hits) = spawn_stub(1).await;
        let provider = GmailProvider::with_base_url(base);

        let stubs = provider.list_threads(&creds(), 10).await.unwrap();
        assert_eq!(stubs.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limit_exhaustion_reports_attempt_count() {
        let (base, hits) = spawn_stub(usize::MAX).await;
        let provider = GmailProvider::with_base_url(base);

        let err = provider.list_threads(&creds(), 10).await.unwrap_err();
        match err {
            ProviderError::RateLimited { provider, attempts } => {
                assert_eq!(provider, "gmail");
                assert_eq!(attempts, MAX_RATE_LIMIT_RETRIES + 1);
            }
            other => panic!("expected a rate limit error, got {other}"),
        }
        assert_eq!(
            hits.load(Ordering::SeqCst),
            (MAX_RATE_LIMIT_RETRIES + 1) as usize
        );
    }

    #[test]
    fn thread_list_tolerates_missing_threads_field() {
        let list: ThreadListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.threads.is_empty());

        let list: ThreadListResponse =
            serde_json::from_str(r#"{"threads":[{"id":"t1"},{"id":"t2"}]}"#).unwrap();
        assert_eq!(list.threads.len(), 2);
        assert_eq!(list.threads[0].id, "t1");
    }
}
