use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Join row binding one user to one feed. The `(user_id, feed_id)` pair is
/// unique in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A feed as seen from a follower's subscription list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowedFeed {
    pub feed_name: String,
    pub feed_url: String,
}

impl fmt::Display for FollowedFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.feed_name, self.feed_url)
    }
}
