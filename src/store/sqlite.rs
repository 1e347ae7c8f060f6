use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{GatorError, Result};
use crate::domain::{
    is_storable_date, Feed, FeedFollow, FeedWithOwner, FollowedFeed, NewPost, Post, User,
};
use crate::store::Store;

const FEED_COLUMNS: &str =
    "f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at, f.last_fetched_at";
const POST_COLUMNS: &str =
    "p.id, p.feed_id, p.title, p.url, p.description, p.published_at, p.fetched_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GatorError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    /// Current time at the precision the database keeps.
    fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    /// Fixed-width encoding, so string order matches chronological order.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    /// SQLite reads a negative LIMIT as "no limit".
    fn sql_limit(limit: usize) -> i64 {
        i64::try_from(limit).unwrap_or(i64::MAX)
    }

    fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        Self::parse_datetime(idx, &raw)
    }

    fn get_optional_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
        row.get::<_, Option<String>>(idx)?
            .map(|raw| Self::parse_datetime(idx, &raw))
            .transpose()
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: Self::get_datetime(row, 2)?,
            updated_at: Self::get_datetime(row, 3)?,
        })
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            created_at: Self::get_datetime(row, 4)?,
            updated_at: Self::get_datetime(row, 5)?,
            last_fetched_at: Self::get_optional_datetime(row, 6)?,
        })
    }

    fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            published_at: Self::get_optional_datetime(row, 5)?,
            fetched_at: Self::get_datetime(row, 6)?,
        })
    }

    fn insert_feed(conn: &Connection, name: &str, url: &str, owner_id: i64) -> Result<Feed> {
        let now = Self::now();
        conn.execute(
            "INSERT INTO feeds (name, url, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![name, url, owner_id, Self::format_datetime(&now)],
        )
        .map_err(|e| {
            GatorError::from_constraint(
                e,
                || format!("feed with url {}", url),
                || format!("user {}", owner_id),
            )
        })?;

        Ok(Feed {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            url: url.to_string(),
            user_id: owner_id,
            created_at: now,
            updated_at: now,
            last_fetched_at: None,
        })
    }

    fn insert_follow(conn: &Connection, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let now = Self::now();
        conn.execute(
            "INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![user_id, feed_id, Self::format_datetime(&now)],
        )
        .map_err(|e| {
            GatorError::from_constraint(
                e,
                || format!("user {} already follows feed {}", user_id, feed_id),
                || format!("user {} or feed {}", user_id, feed_id),
            )
        })?;

        Ok(FeedFollow {
            id: conn.last_insert_rowid(),
            user_id,
            feed_id,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Store for SqliteStore {
    fn create_user(&self, name: &str) -> Result<User> {
        let conn = self.lock()?;
        let now = Self::now();

        conn.execute(
            "INSERT INTO users (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, Self::format_datetime(&now)],
        )
        .map_err(|e| {
            GatorError::from_constraint(e, || format!("user {}", name), || name.to_string())
        })?;

        Ok(User {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_user(&self, name: &str) -> Result<User> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
            params![name],
            Self::user_from_row,
        )
        .optional()?
        .ok_or_else(|| GatorError::NotFound(format!("user {}", name)))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn reset(&self) -> Result<()> {
        let mut conn = self.lock()?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM posts", [])?;
        tx.execute("DELETE FROM feed_follows", [])?;
        tx.execute("DELETE FROM feeds", [])?;
        tx.execute("DELETE FROM users", [])?;
        tx.commit()?;

        Ok(())
    }

    fn create_feed(&self, name: &str, url: &str, owner_id: i64) -> Result<Feed> {
        let conn = self.lock()?;
        Self::insert_feed(&conn, name, url, owner_id)
    }

    fn create_feed_with_follow(
        &self,
        name: &str,
        url: &str,
        owner_id: i64,
    ) -> Result<(Feed, FeedFollow)> {
        let mut conn = self.lock()?;

        let tx = conn.transaction()?;
        let feed = Self::insert_feed(&tx, name, url, owner_id)?;
        let follow = Self::insert_follow(&tx, owner_id, feed.id)?;
        tx.commit()?;

        Ok((feed, follow))
    }

    fn get_feed(&self, id: i64) -> Result<Feed> {
        let conn = self.lock()?;

        conn.query_row(
            &format!("SELECT {} FROM feeds f WHERE f.id = ?1", FEED_COLUMNS),
            params![id],
            Self::feed_from_row,
        )
        .optional()?
        .ok_or_else(|| GatorError::NotFound(format!("feed {}", id)))
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        let conn = self.lock()?;

        conn.query_row(
            &format!("SELECT {} FROM feeds f WHERE f.url = ?1", FEED_COLUMNS),
            params![url],
            Self::feed_from_row,
        )
        .optional()?
        .ok_or_else(|| GatorError::NotFound(format!("feed with url {}", url)))
    }

    fn list_feeds(&self) -> Result<Vec<FeedWithOwner>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {}, u.name FROM feeds f JOIN users u ON u.id = f.user_id ORDER BY f.name, f.url",
            FEED_COLUMNS
        ))?;
        let feeds = stmt
            .query_map([], |row| {
                Ok(FeedWithOwner {
                    feed: Self::feed_from_row(row)?,
                    owner_name: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn list_feeds_due_for_fetch(&self, limit: usize) -> Result<Vec<Feed>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feeds f ORDER BY f.last_fetched_at ASC NULLS FIRST, f.id ASC LIMIT ?1",
            FEED_COLUMNS
        ))?;
        let feeds = stmt
            .query_map(params![Self::sql_limit(limit)], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn mark_fetched(&self, feed_id: i64, fetched_at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE feeds SET last_fetched_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![Self::format_datetime(&fetched_at), feed_id],
        )?;
        if updated == 0 {
            return Err(GatorError::NotFound(format!("feed {}", feed_id)));
        }

        Ok(())
    }

    fn delete_feed(&self, feed_id: i64) -> Result<()> {
        let conn = self.lock()?;

        let deleted = conn.execute("DELETE FROM feeds WHERE id = ?1", params![feed_id])?;
        if deleted == 0 {
            return Err(GatorError::NotFound(format!("feed {}", feed_id)));
        }

        Ok(())
    }

    fn create_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let conn = self.lock()?;
        Self::insert_follow(&conn, user_id, feed_id)
    }

    fn delete_follow(&self, user_id: i64, feed_id: i64) -> Result<()> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2",
            params![user_id, feed_id],
        )?;
        if deleted == 0 {
            return Err(GatorError::NotFound(format!(
                "follow of feed {} by user {}",
                feed_id, user_id
            )));
        }

        Ok(())
    }

    fn list_follows_for_user(&self, user_id: i64) -> Result<Vec<FollowedFeed>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT f.name, f.url FROM feed_follows ff
             JOIN feeds f ON f.id = ff.feed_id
             WHERE ff.user_id = ?1
             ORDER BY ff.id",
        )?;
        let follows = stmt
            .query_map(params![user_id], |row| {
                Ok(FollowedFeed {
                    feed_name: row.get(0)?,
                    feed_url: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(follows)
    }

    fn insert_post_if_new(&self, feed_id: i64, post: &NewPost) -> Result<(Post, bool)> {
        if post.url.trim().is_empty() {
            return Err(GatorError::Validation("post has no url".into()));
        }
        if let Some(published) = post.published_at.filter(|d| !is_storable_date(d)) {
            return Err(GatorError::Validation(format!(
                "post {} has out-of-range publish date {}",
                post.url, published
            )));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO posts (id, feed_id, title, url, description, published_at, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    Post::generate_id(feed_id, &post.url),
                    feed_id,
                    post.title,
                    post.url,
                    post.description,
                    post.published_at.as_ref().map(Self::format_datetime),
                    Self::format_datetime(&Self::now())
                ],
            )
            .map_err(|e| {
                GatorError::from_constraint(
                    e,
                    || format!("post {}", post.url),
                    || format!("feed {}", feed_id),
                )
            })?;

        let stored = tx.query_row(
            &format!(
                "SELECT {} FROM posts p WHERE p.feed_id = ?1 AND p.url = ?2",
                POST_COLUMNS
            ),
            params![feed_id, post.url],
            Self::post_from_row,
        )?;
        tx.commit()?;

        Ok((stored, inserted > 0))
    }

    fn list_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts p
             JOIN feed_follows ff ON ff.feed_id = p.feed_id
             WHERE ff.user_id = ?1
             ORDER BY p.published_at DESC NULLS LAST, p.fetched_at DESC
             LIMIT ?2",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map(params![user_id, Self::sql_limit(limit)], Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn store_with_user(name: &str) -> (SqliteStore, User) {
        let store = SqliteStore::in_memory().unwrap();
        let user = store.create_user(name).unwrap();
        (store, user)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_create_and_get_user() {
        let (store, alice) = store_with_user("alice");

        let retrieved = store.get_user("alice").unwrap();
        assert_eq!(retrieved, alice);
    }

    #[test]
    fn test_duplicate_user_conflicts() {
        let (store, _) = store_with_user("alice");

        let err = store.create_user("alice").unwrap_err();
        assert!(matches!(err, GatorError::Conflict(_)));
        assert_eq!(store.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_get_user_missing() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.get_user("nobody").unwrap_err(),
            GatorError::NotFound(_)
        ));
    }

    #[test]
    fn test_list_users_ordered_by_name() {
        let store = SqliteStore::in_memory().unwrap();
        store.create_user("carol").unwrap();
        store.create_user("alice").unwrap();
        store.create_user("bob").unwrap();

        let names: Vec<String> = store
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_duplicate_feed_url_conflicts() {
        let (store, alice) = store_with_user("alice");
        let bob = store.create_user("bob").unwrap();
        let url = "http://example.com/feed.xml";

        store.create_feed("Blog", url, alice.id).unwrap();
        let err = store.create_feed("Other Blog", url, bob.id).unwrap_err();
        assert!(matches!(err, GatorError::Conflict(_)));

        let matching: Vec<_> = store
            .list_feeds()
            .unwrap()
            .into_iter()
            .filter(|f| f.feed.url == url)
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].owner_name, "alice");
    }

    #[test]
    fn test_create_feed_unknown_owner() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store
            .create_feed("Blog", "http://example.com/feed.xml", 99)
            .unwrap_err();
        assert!(matches!(err, GatorError::NotFound(_)));
    }

    #[test]
    fn test_get_feed_by_url() {
        let (store, alice) = store_with_user("alice");
        let feed = store
            .create_feed("Blog", "http://example.com/feed.xml", alice.id)
            .unwrap();

        assert_eq!(
            store.get_feed_by_url("http://example.com/feed.xml").unwrap(),
            feed
        );
        assert!(matches!(
            store
                .get_feed_by_url("http://example.com/missing.xml")
                .unwrap_err(),
            GatorError::NotFound(_)
        ));
    }

    #[test]
    fn test_create_feed_with_follow_subscribes_owner() {
        let (store, alice) = store_with_user("alice");
        let (feed, follow) = store
            .create_feed_with_follow("Blog", "http://example.com/feed.xml", alice.id)
            .unwrap();

        assert_eq!(follow.user_id, alice.id);
        assert_eq!(follow.feed_id, feed.id);
        assert_eq!(
            store.list_follows_for_user(alice.id).unwrap(),
            vec![FollowedFeed {
                feed_name: "Blog".into(),
                feed_url: "http://example.com/feed.xml".into(),
            }]
        );
    }

    #[test]
    fn test_create_feed_with_follow_rolls_back_on_conflict() {
        let (store, alice) = store_with_user("alice");
        store
            .create_feed_with_follow("Blog", "http://example.com/feed.xml", alice.id)
            .unwrap();

        let err = store
            .create_feed_with_follow("Blog again", "http://example.com/feed.xml", alice.id)
            .unwrap_err();
        assert!(matches!(err, GatorError::Conflict(_)));
        assert_eq!(store.list_feeds().unwrap().len(), 1);
        assert_eq!(store.list_follows_for_user(alice.id).unwrap().len(), 1);
    }

    #[test]
    fn test_due_feeds_never_fetched_first() {
        let (store, alice) = store_with_user("alice");
        let a = store.create_feed("A", "http://a.example/feed", alice.id).unwrap();
        let b = store.create_feed("B", "http://b.example/feed", alice.id).unwrap();
        let c = store.create_feed("C", "http://c.example/feed", alice.id).unwrap();

        store.mark_fetched(a.id, at(3)).unwrap();
        store.mark_fetched(c.id, at(1)).unwrap();

        let due: Vec<i64> = store
            .list_feeds_due_for_fetch(10)
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(due, vec![b.id, c.id, a.id]);
    }

    #[test]
    fn test_due_feeds_respects_limit() {
        let (store, alice) = store_with_user("alice");
        for i in 0..5 {
            store
                .create_feed(&format!("Feed {}", i), &format!("http://example.com/{}", i), alice.id)
                .unwrap();
        }

        assert_eq!(store.list_feeds_due_for_fetch(2).unwrap().len(), 2);
        assert!(store.list_feeds_due_for_fetch(0).unwrap().is_empty());
    }

    #[test]
    fn test_mark_fetched_moves_feed_behind_staler_feeds() {
        let (store, alice) = store_with_user("alice");
        let a = store.create_feed("A", "http://a.example/feed", alice.id).unwrap();
        let b = store.create_feed("B", "http://b.example/feed", alice.id).unwrap();
        store.mark_fetched(a.id, at(1)).unwrap();
        store.mark_fetched(b.id, at(2)).unwrap();

        // a is now the freshest
        store.mark_fetched(a.id, at(5)).unwrap();
        let due = store.list_feeds_due_for_fetch(10).unwrap();
        assert_eq!(due[0].id, b.id);
        assert_eq!(due[1].id, a.id);
        assert_eq!(due[1].last_fetched_at, Some(at(5)));
    }

    #[test]
    fn test_mark_fetched_is_idempotent() {
        let (store, alice) = store_with_user("alice");
        let feed = store.create_feed("A", "http://a.example/feed", alice.id).unwrap();

        store.mark_fetched(feed.id, at(4)).unwrap();
        store.mark_fetched(feed.id, at(4)).unwrap();
        assert_eq!(store.get_feed(feed.id).unwrap().last_fetched_at, Some(at(4)));
    }

    #[test]
    fn test_mark_fetched_subsecond_ordering() {
        let (store, alice) = store_with_user("alice");
        let a = store.create_feed("A", "http://a.example/feed", alice.id).unwrap();
        let b = store.create_feed("B", "http://b.example/feed", alice.id).unwrap();

        let whole = at(1);
        let fraction = whole + chrono::Duration::milliseconds(250);
        store.mark_fetched(a.id, fraction).unwrap();
        store.mark_fetched(b.id, whole).unwrap();

        let due = store.list_feeds_due_for_fetch(10).unwrap();
        assert_eq!(due[0].id, b.id);
        assert_eq!(due[1].last_fetched_at, Some(fraction));
    }

    #[test]
    fn test_mark_fetched_unknown_feed() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.mark_fetched(1, at(1)).unwrap_err(),
            GatorError::NotFound(_)
        ));
    }

    #[test]
    fn test_duplicate_follow_conflicts_and_keeps_first_row() {
        let (store, alice) = store_with_user("alice");
        let bob = store.create_user("bob").unwrap();
        let feed = store.create_feed("Blog", "http://example.com/feed.xml", alice.id).unwrap();

        let first = store.create_follow(bob.id, feed.id).unwrap();
        let err = store.create_follow(bob.id, feed.id).unwrap_err();
        assert!(matches!(err, GatorError::Conflict(_)));

        assert_eq!(store.list_follows_for_user(bob.id).unwrap().len(), 1);
        // Re-following after an unfollow must still work, proving the first row was intact.
        store.delete_follow(bob.id, first.feed_id).unwrap();
        store.create_follow(bob.id, feed.id).unwrap();
    }

    #[test]
    fn test_follow_unknown_ids() {
        let (store, alice) = store_with_user("alice");
        let feed = store.create_feed("Blog", "http://example.com/feed.xml", alice.id).unwrap();

        assert!(matches!(
            store.create_follow(alice.id, feed.id + 100).unwrap_err(),
            GatorError::NotFound(_)
        ));
        assert!(matches!(
            store.create_follow(alice.id + 100, feed.id).unwrap_err(),
            GatorError::NotFound(_)
        ));
    }

    #[test]
    fn test_delete_missing_follow_is_not_found() {
        let (store, alice) = store_with_user("alice");
        let bob = store.create_user("bob").unwrap();
        let (feed, _) = store
            .create_feed_with_follow("Blog", "http://example.com/feed.xml", alice.id)
            .unwrap();

        let err = store.delete_follow(bob.id, feed.id).unwrap_err();
        assert!(matches!(err, GatorError::NotFound(_)));
        assert_eq!(store.list_follows_for_user(alice.id).unwrap().len(), 1);
        assert!(store.list_follows_for_user(bob.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_follow_keeps_feed_and_user() {
        let (store, alice) = store_with_user("alice");
        let (feed, _) = store
            .create_feed_with_follow("Blog", "http://example.com/feed.xml", alice.id)
            .unwrap();

        store.delete_follow(alice.id, feed.id).unwrap();
        assert!(store.list_follows_for_user(alice.id).unwrap().is_empty());
        assert_eq!(store.get_feed(feed.id).unwrap(), feed);
        assert_eq!(store.get_user("alice").unwrap(), alice);
    }

    #[test]
    fn test_insert_post_if_new_is_idempotent() {
        let (store, alice) = store_with_user("alice");
        let feed = store.create_feed("Blog", "http://example.com/feed.xml", alice.id).unwrap();

        let mut post = NewPost::new("http://example.com/post-1");
        post.title = Some("Original Title".into());
        post.published_at = Some(at(6));
        let (first, inserted) = store.insert_post_if_new(feed.id, &post).unwrap();
        assert!(inserted);
        assert_eq!(first.id, Post::generate_id(feed.id, "http://example.com/post-1"));

        post.title = Some("Different Title".into());
        let (second, inserted) = store.insert_post_if_new(feed.id, &post).unwrap();
        assert!(!inserted);
        assert_eq!(second, first);
        assert_eq!(second.title, Some("Original Title".into()));
    }

    #[test]
    fn test_same_post_url_in_different_feeds() {
        let (store, alice) = store_with_user("alice");
        let a = store.create_feed("A", "http://a.example/feed", alice.id).unwrap();
        let b = store.create_feed("B", "http://b.example/feed", alice.id).unwrap();
        let post = NewPost::new("http://example.com/shared");

        assert!(store.insert_post_if_new(a.id, &post).unwrap().1);
        assert!(store.insert_post_if_new(b.id, &post).unwrap().1);
    }

    #[test]
    fn test_insert_post_rejects_empty_url_and_unknown_feed() {
        let (store, alice) = store_with_user("alice");
        let feed = store.create_feed("A", "http://a.example/feed", alice.id).unwrap();

        assert!(matches!(
            store.insert_post_if_new(feed.id, &NewPost::new("  ")).unwrap_err(),
            GatorError::Validation(_)
        ));
        assert!(matches!(
            store
                .insert_post_if_new(feed.id + 1, &NewPost::new("http://example.com/x"))
                .unwrap_err(),
            GatorError::NotFound(_)
        ));
    }

    #[test]
    fn test_insert_post_rejects_unstorable_dates() {
        let (store, alice) = store_with_user("alice");
        let (feed, _) = store
            .create_feed_with_follow("A", "http://a.example/feed", alice.id)
            .unwrap();

        for year in [10000, -1] {
            let mut post = NewPost::new(format!("http://example.com/{}", year));
            post.published_at = Some(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap());
            assert!(matches!(
                store.insert_post_if_new(feed.id, &post).unwrap_err(),
                GatorError::Validation(_)
            ));
        }

        let mut edge = NewPost::new("http://example.com/edge");
        edge.published_at = Some(Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap());
        let (stored, inserted) = store.insert_post_if_new(feed.id, &edge).unwrap();
        assert!(inserted);
        assert_eq!(stored.published_at, edge.published_at);
        assert_eq!(store.list_posts_for_user(alice.id, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_huge_limit_is_clamped() {
        assert_eq!(SqliteStore::sql_limit(usize::MAX), i64::MAX);
        assert_eq!(SqliteStore::sql_limit(3), 3);

        let (store, alice) = store_with_user("alice");
        let (feed, _) = store
            .create_feed_with_follow("A", "http://a.example/feed", alice.id)
            .unwrap();
        for i in 0..3 {
            store
                .insert_post_if_new(feed.id, &NewPost::new(format!("http://example.com/{}", i)))
                .unwrap();
        }
        assert_eq!(store.list_posts_for_user(alice.id, usize::MAX).unwrap().len(), 3);
        assert_eq!(store.list_feeds_due_for_fetch(usize::MAX).unwrap().len(), 1);
    }

    #[test]
    fn test_list_posts_for_user_only_followed_feeds() {
        let (store, alice) = store_with_user("alice");
        let bob = store.create_user("bob").unwrap();
        let (followed, _) = store
            .create_feed_with_follow("A", "http://a.example/feed", alice.id)
            .unwrap();
        let (other, _) = store
            .create_feed_with_follow("B", "http://b.example/feed", bob.id)
            .unwrap();

        let mut old = NewPost::new("http://a.example/old");
        old.published_at = Some(at(1));
        let mut new = NewPost::new("http://a.example/new");
        new.published_at = Some(at(9));
        let undated = NewPost::new("http://a.example/undated");
        store.insert_post_if_new(followed.id, &old).unwrap();
        store.insert_post_if_new(followed.id, &undated).unwrap();
        store.insert_post_if_new(followed.id, &new).unwrap();
        store
            .insert_post_if_new(other.id, &NewPost::new("http://b.example/post"))
            .unwrap();

        let urls: Vec<String> = store
            .list_posts_for_user(alice.id, 10)
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://a.example/new",
                "http://a.example/old",
                "http://a.example/undated"
            ]
        );
        assert_eq!(store.list_posts_for_user(alice.id, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_feed_cascades_follows_and_posts() {
        let (store, alice) = store_with_user("alice");
        let (feed, _) = store
            .create_feed_with_follow("Blog", "http://example.com/feed.xml", alice.id)
            .unwrap();
        store
            .insert_post_if_new(feed.id, &NewPost::new("http://example.com/post-1"))
            .unwrap();

        store.delete_feed(feed.id).unwrap();

        assert!(matches!(store.get_feed(feed.id).unwrap_err(), GatorError::NotFound(_)));
        assert!(store.list_follows_for_user(alice.id).unwrap().is_empty());
        assert!(store.list_posts_for_user(alice.id, 10).unwrap().is_empty());
        assert!(matches!(store.delete_feed(feed.id).unwrap_err(), GatorError::NotFound(_)));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (store, alice) = store_with_user("alice");
        let (feed, _) = store
            .create_feed_with_follow("Blog", "http://example.com/feed.xml", alice.id)
            .unwrap();
        store
            .insert_post_if_new(feed.id, &NewPost::new("http://example.com/post-1"))
            .unwrap();

        store.reset().unwrap();

        assert!(store.list_users().unwrap().is_empty());
        assert!(store.list_feeds().unwrap().is_empty());
        assert!(store.list_feeds_due_for_fetch(10).unwrap().is_empty());
        // Names are free again after a reset.
        store.create_user("alice").unwrap();
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gator.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.create_user("alice").unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(reopened.get_user("alice").unwrap().name, "alice");
    }
}
