use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub feed_id: i64,
    pub title: Option<String>,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

impl Post {
    /// Generate a deterministic ID from the owning feed and the post URL.
    ///
    /// `(feed_id, url)` is the dedup key, so two ingestions of the same link
    /// always land on the same row.
    pub fn generate_id(feed_id: i64, url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(feed_id.to_be_bytes());
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}

/// A post as produced by the ingestion pipeline, before the store assigns
/// its identity and ingestion timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    pub title: Option<String>,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Whether `dt` falls in years 0000-9999, the range timestamps are stored in.
pub fn is_storable_date(dt: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&dt.year())
}
