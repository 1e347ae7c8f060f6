//! Ingestion of parsed feeds into the store.

use std::sync::Arc;

use chrono::Utc;

use crate::app::{GatorError, Result};
use crate::domain::Feed;
use crate::normalizer::ParsedFeed;
use crate::store::Store;

/// Per-feed outcome of one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestResult {
    pub inserted: usize,
    /// Items not inserted: duplicates plus `invalid` ones.
    pub skipped: usize,
    /// Items rejected for a missing link or an unstorable date.
    pub invalid: usize,
}

pub struct Ingester<S> {
    store: Arc<S>,
}

impl<S> Clone for Ingester<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> Ingester<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Store every new item of `parsed` for `feed`, in document order, then
    /// advance the feed's watermark once.
    ///
    /// Items the store rejects (no link, unstorable date) are counted and
    /// skipped; they never abort the batch. Any other store failure does abort
    /// it, leaving the watermark untouched.
    pub fn ingest(&self, feed: &Feed, parsed: &ParsedFeed) -> Result<IngestResult> {
        let mut result = IngestResult::default();

        for item in &parsed.items {
            let Some(post) = item.to_new_post() else {
                tracing::debug!(
                    feed = %feed.url,
                    title = item.title.as_deref().unwrap_or(""),
                    "skipping item without a link"
                );
                result.invalid += 1;
                result.skipped += 1;
                continue;
            };

            match self.store.insert_post_if_new(feed.id, &post) {
                Ok((_, true)) => result.inserted += 1,
                Ok((_, false)) => result.skipped += 1,
                Err(GatorError::Validation(reason)) => {
                    tracing::debug!(feed = %feed.url, url = %post.url, %reason, "skipping invalid item");
                    result.invalid += 1;
                    result.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.store.mark_fetched(feed.id, Utc::now())?;

        tracing::info!(
            feed = %feed.url,
            inserted = result.inserted,
            skipped = result.skipped,
            invalid = result.invalid,
            "ingested feed"
        );

        Ok(result)
    }
}
