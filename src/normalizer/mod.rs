use chrono::{DateTime, Utc};
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::domain::{is_storable_date, NewPost};
use crate::fetcher::FetchError;

/// A remote feed document reduced to the fields the aggregator stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Items in document order.
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedItem {
    pub title: Option<String>,
    /// `None` when the item carries no usable link.
    pub link: Option<String>,
    pub description: Option<String>,
    /// Best-effort; `None` when the document has no parseable date.
    pub published_at: Option<DateTime<Utc>>,
}

impl ParsedItem {
    /// Convert into a storable post, or `None` if the item has no link to
    /// deduplicate on.
    pub fn to_new_post(&self) -> Option<NewPost> {
        let link = self.link.as_deref()?.trim();
        if link.is_empty() {
            return None;
        }

        Some(NewPost {
            title: self.title.clone(),
            url: link.to_string(),
            description: self.description.clone(),
            published_at: self.published_at,
        })
    }
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse an RSS, Atom or JSON feed body.
    ///
    /// `url` is only used to label parse failures.
    pub fn normalize(&self, url: &str, body: &[u8]) -> Result<ParsedFeed, FetchError> {
        let feed = parser::parse(body).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| ParsedItem {
                title: entry.title.map(|t| decode(&t.content)),
                link: entry
                    .links
                    .into_iter()
                    .map(|l| l.href.trim().to_string())
                    .find(|href| !href.is_empty()),
                description: entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .map(|d| decode(&d)),
                published_at: entry
                    .published
                    .filter(is_storable_date)
                    .or(entry.updated.filter(is_storable_date)),
            })
            .collect();

        Ok(ParsedFeed {
            title: feed.title.map(|t| decode(&t.content)),
            description: feed.description.map(|d| decode(&d.content)),
            items,
        })
    }
}

fn decode(s: &str) -> String {
    decode_html_entities(s.trim()).to_string()
}
