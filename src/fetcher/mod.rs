pub mod http_fetcher;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::normalizer::ParsedFeed;

pub use http_fetcher::HttpFetcher;

/// Any failure to obtain a parsed feed from a remote URL.
///
/// Fetchers never retry; a failed feed simply stays due for the next poll.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} did not respond within {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("could not parse feed at {url}: {reason}")]
    Parse { url: String, reason: String },
}

#[async_trait]
pub trait Fetcher {
    /// GET `url` and parse the body as a feed, giving up after `timeout`.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<ParsedFeed, FetchError>;
}
