pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Feed, FeedFollow, FeedWithOwner, FollowedFeed, NewPost, Post, User};

pub use sqlite::SqliteStore;

/// Durable storage for users, feeds, follows and posts.
///
/// Uniqueness and referential invariants are enforced here rather than by
/// callers: a unique-key collision is reported as
/// [`GatorError::Conflict`](crate::app::GatorError::Conflict) and a dangling
/// reference as [`GatorError::NotFound`](crate::app::GatorError::NotFound).
/// Concurrent writers synchronize through those errors.
pub trait Store {
    // User operations
    fn create_user(&self, name: &str) -> Result<User>;
    fn get_user(&self, name: &str) -> Result<User>;
    fn list_users(&self) -> Result<Vec<User>>;
    /// Destroy every user, feed, follow and post.
    fn reset(&self) -> Result<()>;

    // Feed operations
    fn create_feed(&self, name: &str, url: &str, owner_id: i64) -> Result<Feed>;
    /// Create a feed and subscribe its owner in a single transaction.
    fn create_feed_with_follow(
        &self,
        name: &str,
        url: &str,
        owner_id: i64,
    ) -> Result<(Feed, FeedFollow)>;
    fn get_feed(&self, id: i64) -> Result<Feed>;
    fn get_feed_by_url(&self, url: &str) -> Result<Feed>;
    fn list_feeds(&self) -> Result<Vec<FeedWithOwner>>;
    /// Feeds ordered by watermark, never-fetched first, capped at `limit`.
    fn list_feeds_due_for_fetch(&self, limit: usize) -> Result<Vec<Feed>>;
    fn mark_fetched(&self, feed_id: i64, fetched_at: DateTime<Utc>) -> Result<()>;
    /// Delete a feed together with its follows and posts.
    fn delete_feed(&self, feed_id: i64) -> Result<()>;

    // Follow operations
    fn create_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow>;
    fn delete_follow(&self, user_id: i64, feed_id: i64) -> Result<()>;
    fn list_follows_for_user(&self, user_id: i64) -> Result<Vec<FollowedFeed>>;

    // Post operations
    /// Insert a post unless `(feed_id, post.url)` is already stored.
    ///
    /// Returns the stored row and whether this call inserted it.
    fn insert_post_if_new(&self, feed_id: i64, post: &NewPost) -> Result<(Post, bool)>;
    fn list_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>>;
}
