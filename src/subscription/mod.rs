use std::sync::Arc;

use url::Url;

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, FollowedFeed, User};
use crate::store::Store;

/// Follow, unfollow and feed registration on behalf of a user.
pub struct Subscriptions<S> {
    store: Arc<S>,
}

impl<S: Store> Subscriptions<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register a new feed and subscribe its creator to it atomically.
    pub fn add_feed(&self, user: &User, name: &str, url: &str) -> Result<(Feed, FeedFollow)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GatorError::Validation("feed name must not be empty".into()));
        }
        let url = validate_feed_url(url)?;

        let (feed, follow) = self.store.create_feed_with_follow(name, &url, user.id)?;
        tracing::info!(feed = %feed.url, user = %user.name, "feed added");
        Ok((feed, follow))
    }

    pub fn follow(&self, user: &User, url: &str) -> Result<(Feed, FeedFollow)> {
        let feed = self.store.get_feed_by_url(url.trim())?;
        let follow = self.store.create_follow(user.id, feed.id)?;
        Ok((feed, follow))
    }

    pub fn unfollow(&self, user: &User, url: &str) -> Result<Feed> {
        let feed = self.store.get_feed_by_url(url.trim())?;
        self.store.delete_follow(user.id, feed.id)?;
        Ok(feed)
    }

    pub fn following(&self, user: &User) -> Result<Vec<FollowedFeed>> {
        self.store.list_follows_for_user(user.id)
    }

    /// Delete a feed the user created, along with every follow and post of it.
    pub fn remove_feed(&self, user: &User, url: &str) -> Result<Feed> {
        let feed = self.store.get_feed_by_url(url.trim())?;
        if !feed.is_owned_by(user.id) {
            return Err(GatorError::Validation(format!(
                "only the user who added {} can remove it",
                feed.url
            )));
        }

        self.store.delete_feed(feed.id)?;
        tracing::info!(feed = %feed.url, user = %user.name, "feed removed");
        Ok(feed)
    }
}

/// Feeds are fetched over plain HTTP(S); anything else is rejected up front.
fn validate_feed_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let parsed =
        Url::parse(raw).map_err(|e| GatorError::Validation(format!("invalid url {}: {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        other => Err(GatorError::Validation(format!(
            "unsupported url scheme {} in {}",
            other, raw
        ))),
    }
}
