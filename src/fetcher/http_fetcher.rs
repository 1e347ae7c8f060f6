use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;

use crate::fetcher::{FetchError, Fetcher};
use crate::normalizer::{Normalizer, ParsedFeed};

const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));
const ACCEPT_FEEDS: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.5";

pub struct HttpFetcher {
    client: Client,
    normalizer: Normalizer,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_client(Self::default_client())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            normalizer: Normalizer::new(),
        }
    }

    fn default_client() -> Client {
        Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default HTTP client: {}", e);
                Client::new()
            })
    }

    fn classify(url: &str, timeout: Duration, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source,
            }
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<ParsedFeed, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static(ACCEPT_FEEDS))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::classify(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify(url, timeout, e))?;
        tracing::debug!(url, bytes = body.len(), "fetched feed body");

        self.normalizer.normalize(url, &body)
    }
}
