//! # Gator
//!
//! A multi-user RSS/Atom feed aggregator for the terminal.
//!
//! ## Architecture
//!
//! Users follow feeds; a scheduler keeps feed content current:
//!
//! ```text
//! Scheduler → Fetcher → Normalizer → Ingester → Store
//! ```
//!
//! - [`scheduler`]: picks the least-recently-fetched feeds on a fixed interval
//! - [`fetcher`]: HTTP client with per-request timeouts
//! - [`normalizer`]: Converts RSS/Atom documents to [`ParsedFeed`](normalizer::ParsedFeed)
//! - [`ingest`]: Deduplicates items into posts and advances the watermark
//! - [`store`]: SQLite persistence layer
//!
//! ## Quick Start
//!
//! ```bash
//! gator register alice
//! gator addfeed "Rust Blog" https://blog.rust-lang.org/feed.xml
//! gator agg 1m
//! gator browse 5
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// fetcher, subscription manager and the caller's config.
pub mod app;

/// Command-line interface using clap.
///
/// Each [`Commands`](cli::Commands) variant declares whether it needs a
/// logged-in user; [`dispatch`](cli::commands::dispatch) resolves that user
/// before calling the handler.
pub mod cli;

/// JSON configuration at `~/.gatorconfig.json`.
pub mod config;

/// Core domain models.
///
/// - [`User`](domain::User), [`Feed`](domain::Feed)
/// - [`FeedFollow`](domain::FeedFollow): user ↔ feed subscription
/// - [`Post`](domain::Post): an ingested feed item with a SHA-256 ID
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Storing parsed feeds as posts.
pub mod ingest;

/// Feed parsing and normalization.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0 via feed-rs.
pub mod normalizer;

/// Periodic, bounded-parallel aggregation of due feeds.
pub mod scheduler;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Follow/unfollow and feed registration.
pub mod subscription;
