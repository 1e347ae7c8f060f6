use rusqlite::ffi;
use thiserror::Error;

use crate::config::ConfigError;
use crate::fetcher::FetchError;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl GatorError {
    /// Translate a constraint failure into the store's error taxonomy.
    ///
    /// Unique and primary-key violations become `Conflict(conflict)`,
    /// foreign-key violations become `NotFound(missing)`. Anything else stays
    /// a database error.
    pub(crate) fn from_constraint(
        err: rusqlite::Error,
        conflict: impl FnOnce() -> String,
        missing: impl FnOnce() -> String,
    ) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                GatorError::Conflict(conflict())
            }
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                GatorError::NotFound(missing())
            }
            _ => GatorError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatorError>;
