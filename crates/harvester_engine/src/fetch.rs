use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 5,
            max_bytes: 200 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Retrieves one media asset. Cancelling the token aborts a request that is
/// still waiting for its response; a body already being read completes.
#[async_trait::async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str, cancel: &CancellationToken)
        -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, redirect_counter: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        // Originals are only served without a Referer.
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .user_agent(self.settings.user_agent.clone())
            .referer(false)
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }

    /// Streams the body, giving up as soon as it passes `max_bytes`.
    async fn read_capped(&self, response: reqwest::Response) -> Result<Bytes, FetchError> {
        if let Some(declared) = response.content_length() {
            if declared > self.settings.max_bytes {
                return Err(self.too_large(declared));
            }
        }
        let mut body = BytesMut::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let received = (body.len() + chunk.len()) as u64;
            if received > self.settings.max_bytes {
                return Err(self.too_large(received));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }

    async fn fetch_inner(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError> {
        let target = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let redirects = Arc::new(AtomicUsize::new(0));
        let request = self.build_client(redirects.clone())?.get(target).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::new(FailureKind::Cancelled, "request aborted"));
            }
            sent = request => sent.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let final_url = response.url().to_string();
        let content_type = media_type(response.headers());
        let bytes = self.read_capped(response).await?;

        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url,
                redirect_count: redirects.load(Ordering::Relaxed),
                content_type,
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

fn media_type(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl MediaFetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError> {
        self.fetch_inner(url, cancel).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
