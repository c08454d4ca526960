use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::analytics::AnalyticsService;
use crate::config::AppConfig;
use crate::error::AppServicesError;
use crate::session_store::SessionStore;

/// Assembles the store adapter and analytics over one storage handle.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    sessions: Arc<SessionStore>,
    analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage at `config.database.url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage =
            Storage::sqlite_with(&config.database.url, config.database.pool_settings()).await?;
        tracing::info!(url = %config.database.url, "opened session database");
        Ok(Self::from_storage(&storage, config, clock))
    }

    fn from_storage(storage: &Storage, config: &AppConfig, clock: Clock) -> Self {
        let sessions = Arc::new(SessionStore::new(
            clock,
            Arc::clone(&storage.sessions),
            config.feed.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(Arc::clone(&storage.sessions)));
        Self {
            clock,
            sessions,
            analytics,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }
}
