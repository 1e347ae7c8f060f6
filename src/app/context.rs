use std::sync::Arc;

use crate::app::error::{GatorError, Result};
use crate::config::Config;
use crate::domain::User;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::store::{SqliteStore, Store};
use crate::subscription::Subscriptions;

/// Everything a command needs: the store, a fetcher and the caller's config.
///
/// The current user lives in `config` and is passed around with the context
/// rather than read from disk by whoever needs it.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub subscriptions: Subscriptions<SqliteStore>,
    pub config: Config,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.database_path()?;
        tracing::debug!(path = %db_path.display(), "opening database");
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Ok(Self::with_store(store, config))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Ok(Self::with_store(store, config))
    }

    fn with_store(store: Arc<SqliteStore>, config: Config) -> Self {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new());
        let subscriptions = Subscriptions::new(store.clone());

        Self {
            store,
            fetcher,
            subscriptions,
            config,
        }
    }

    /// Resolve the configured current user against the store.
    pub fn current_user(&self) -> Result<User> {
        let name = self.config.current_user_name.as_deref().ok_or_else(|| {
            GatorError::Validation("no user is logged in; run `gator login <name>` first".into())
        })?;
        self.store.get_user(name)
    }
}
