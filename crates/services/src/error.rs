//! Shared error types for the services crate.

use thiserror::Error;

use activator_core::model::SessionValidationError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted when submitting a session.
///
/// Neither variant is retried; the caller keeps its form state and lets the
/// user resubmit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("invalid session: {0}")]
    Invalid(#[from] SessionValidationError),
    #[error("failed to store session: {0}")]
    Write(#[source] StorageError),
}

/// A live feed could not produce a snapshot. The feed ends after reporting it.
#[derive(Debug, Error)]
#[error("session feed failed: {0}")]
pub struct FeedError(#[from] pub StorageError);

/// The full-collection read behind a report failed; no partial result exists.
#[derive(Debug, Error)]
#[error("failed to load sessions for analytics: {0}")]
pub struct AggregationError(#[from] pub StorageError);

/// Errors emitted while writing a CSV export.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error("failed to write export {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors emitted while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
