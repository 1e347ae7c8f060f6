//! Periodic aggregation of due feeds.
//!
//! Each tick selects the least-recently-fetched feeds, then fetches and
//! ingests them concurrently. A failed feed keeps its old watermark and is
//! therefore first in line on the next tick.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::{interval, MissedTickBehavior};

use crate::app::{GatorError, Result};
use crate::domain::Feed;
use crate::fetcher::{FetchError, Fetcher};
use crate::ingest::{IngestResult, Ingester};
use crate::store::Store;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between the start of consecutive ticks.
    pub interval: Duration,
    /// Feeds selected, and processed in parallel, per tick.
    pub concurrency: usize,
    /// Upper bound on a single fetch, including reading the body.
    pub fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl SchedulerConfig {
    /// Parse interval string like "30s", "5m", "1h", "1d" or raw seconds.
    pub fn parse_interval(s: &str) -> std::result::Result<Duration, String> {
        let s = s.trim().to_lowercase();

        let (value, unit, scale) = if let Some(hours) = s.strip_suffix('h') {
            (hours, "hours", 3600)
        } else if let Some(minutes) = s.strip_suffix('m') {
            (minutes, "minutes", 60)
        } else if let Some(days) = s.strip_suffix('d') {
            (days, "days", 86400)
        } else if let Some(secs) = s.strip_suffix('s') {
            (secs, "seconds", 1)
        } else {
            (s.as_str(), "interval", 1)
        };

        let secs = value
            .parse::<u64>()
            .map_err(|_| format!("Invalid {}: {}. Use format like '30s', '5m', '1h'", unit, value))?
            .checked_mul(scale)
            .ok_or_else(|| format!("Interval too large: {}", s))?;

        if secs == 0 {
            return Err("Interval must be greater than zero".to_string());
        }
        Ok(Duration::from_secs(secs))
    }

    /// Format interval for display
    pub fn format_interval(interval: Duration) -> String {
        let secs = interval.as_secs();
        if secs >= 86400 && secs % 86400 == 0 {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else if secs > 0 {
            format!("{}s", secs)
        } else {
            format!("{}ms", interval.as_millis())
        }
    }
}

/// Where a feed is in its fetch cycle.
///
/// `Idle` feeds have no entry in the in-flight table; every other state is
/// held by exactly one task at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Fetching,
    Ingesting,
    FailedFetch,
}

/// Summary of one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Selected feeds skipped because a fetch for them was already running.
    pub busy: usize,
    pub inserted: usize,
}

type InFlight = Arc<Mutex<HashMap<i64, FeedState>>>;

/// Exclusive claim on a feed for the duration of one fetch cycle. Dropping it
/// returns the feed to `Idle`.
struct InFlightGuard {
    table: InFlight,
    feed_id: i64,
}

impl InFlightGuard {
    fn claim(table: &InFlight, feed_id: i64) -> Option<Self> {
        let mut states = table.lock().unwrap_or_else(|e| e.into_inner());
        if states.contains_key(&feed_id) {
            return None;
        }
        states.insert(feed_id, FeedState::Fetching);

        Some(Self {
            table: table.clone(),
            feed_id,
        })
    }

    fn set(&self, state: FeedState) {
        let mut states = self.table.lock().unwrap_or_else(|e| e.into_inner());
        states.insert(self.feed_id, state);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut states = self.table.lock().unwrap_or_else(|e| e.into_inner());
        states.remove(&self.feed_id);
    }
}

enum FeedOutcome {
    Ingested(IngestResult),
    Failed,
}

pub struct Scheduler<S> {
    store: Arc<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    ingester: Ingester<S>,
    config: SchedulerConfig,
    in_flight: InFlight,
}

impl<S: Store + Send + Sync + 'static> Scheduler<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            ingester: Ingester::new(store.clone()),
            store,
            fetcher,
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state_of(&self, feed_id: i64) -> FeedState {
        let states = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        states.get(&feed_id).copied().unwrap_or(FeedState::Idle)
    }

    /// Run ticks every `interval` until `shutdown` resolves.
    ///
    /// The first tick starts immediately. Shutdown is observed between ticks.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if self.config.interval.is_zero() {
            return Err(GatorError::Validation(
                "scheduler interval must be greater than zero".into(),
            ));
        }

        tracing::info!(
            interval = %SchedulerConfig::format_interval(self.config.interval),
            concurrency = self.config.concurrency,
            "collecting feeds"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("scheduler shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_tick().await {
                        tracing::warn!(error = %e, "scheduler tick failed");
                    }
                }
            }
        }

        Ok(())
    }

    /// Fetch and ingest up to `concurrency` due feeds.
    ///
    /// Per-feed failures are logged and counted, never returned. The only
    /// error is failing to select feeds in the first place.
    pub async fn run_tick(&self) -> Result<TickReport> {
        let limit = self.config.concurrency.max(1);
        let feeds = self.store.list_feeds_due_for_fetch(limit)?;

        let mut report = TickReport {
            selected: feeds.len(),
            ..Default::default()
        };
        if feeds.is_empty() {
            tracing::debug!("no feeds due for fetch");
            return Ok(report);
        }

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut handles = Vec::with_capacity(feeds.len());

        for feed in feeds {
            let Some(guard) = InFlightGuard::claim(&self.in_flight, feed.id) else {
                tracing::debug!(feed = %feed.url, "fetch already in flight, skipping");
                report.busy += 1;
                continue;
            };

            let fetcher = self.fetcher.clone();
            let ingester = self.ingester.clone();
            let semaphore = semaphore.clone();
            let timeout = self.config.fetch_timeout;

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        tracing::error!(feed = %feed.url, error = %e, "worker pool closed");
                        return FeedOutcome::Failed;
                    }
                };
                process_feed(fetcher, ingester, feed, timeout, guard).await
            }));
        }

        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(FeedOutcome::Ingested(result)) => {
                    report.succeeded += 1;
                    report.inserted += result.inserted;
                }
                Ok(FeedOutcome::Failed) => report.failed += 1,
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            selected = report.selected,
            succeeded = report.succeeded,
            failed = report.failed,
            busy = report.busy,
            inserted = report.inserted,
            "tick complete"
        );

        Ok(report)
    }
}

async fn fetch_with_timeout(
    fetcher: &(dyn Fetcher + Send + Sync),
    url: &str,
    timeout: Duration,
) -> std::result::Result<crate::normalizer::ParsedFeed, FetchError> {
    match tokio::time::timeout(timeout, fetcher.fetch(url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            timeout,
        }),
    }
}

async fn process_feed<S: Store>(
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    ingester: Ingester<S>,
    feed: Feed,
    timeout: Duration,
    guard: InFlightGuard,
) -> FeedOutcome {
    tracing::debug!(feed = %feed.url, state = ?FeedState::Fetching, "fetching feed");

    let parsed = match fetch_with_timeout(fetcher.as_ref(), &feed.url, timeout).await {
        Ok(parsed) => parsed,
        Err(e) => {
            guard.set(FeedState::FailedFetch);
            tracing::warn!(feed = %feed.url, error = %e, "failed to fetch feed");
            return FeedOutcome::Failed;
        }
    };

    guard.set(FeedState::Ingesting);
    tracing::debug!(
        feed = %feed.url,
        title = parsed.title.as_deref().unwrap_or(""),
        items = parsed.items.len(),
        "ingesting feed"
    );

    match ingester.ingest(&feed, &parsed) {
        Ok(result) => FeedOutcome::Ingested(result),
        Err(e) => {
            tracing::warn!(feed = %feed.url, error = %e, "failed to ingest feed");
            FeedOutcome::Failed
        }
    }
}
