use std::sync::{Arc, Mutex, PoisonError};

use activator_core::Clock;
use activator_core::model::{SessionDraft, SessionId};
use chrono::{DateTime, Duration, Utc};
use storage::repository::{SessionRepository, SessionScope};
use tokio::sync::broadcast;

use crate::config::FeedConfig;
use crate::error::SubmitError;
use crate::feed::{FeedHandle, FeedUpdate, SessionChange, SessionFeed};

/// Writes session records and serves live feeds over them.
pub struct SessionStore {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    changes: broadcast::Sender<SessionChange>,
    last_stamp: Mutex<Option<DateTime<Utc>>>,
    feed: FeedConfig,
}

impl SessionStore {
    #[must_use]
    pub fn new(clock: Clock, sessions: Arc<dyn SessionRepository>, feed: FeedConfig) -> Self {
        let (changes, _) = broadcast::channel(feed.change_capacity.max(1));
        Self {
            clock,
            sessions,
            changes,
            last_stamp: Mutex::new(None),
            feed,
        }
    }

    /// Validate and store a new session, returning its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::Invalid` if the draft is rejected (nothing is
    /// written) or `SubmitError::Write` if the repository write fails.
    pub async fn submit(&self, draft: SessionDraft) -> Result<SessionId, SubmitError> {
        let session = draft.validate()?;
        let created_at = self.next_stamp();
        let id = self
            .sessions
            .insert_session(&session, created_at)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "session write failed");
                SubmitError::Write(err)
            })?;

        tracing::info!(
            %id,
            association = %session.association(),
            school = session.school(),
            participants = session.participants(),
            "session submitted"
        );
        // No live feeds is not an error.
        let _ = self.changes.send(SessionChange {
            id,
            submitted_by: session.submitted_by().clone(),
        });
        Ok(id)
    }

    /// Open a live feed over the newest sessions in `scope`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn subscribe(&self, scope: SessionScope) -> SessionFeed {
        // Listen before the first query so a write racing it still triggers
        // a refresh.
        let changes = self.changes.subscribe();
        SessionFeed::spawn(Arc::clone(&self.sessions), scope, &self.feed, changes)
    }

    /// Callback form of [`SessionStore::subscribe`].
    ///
    /// `on_update` sees every update in order until the handle is cancelled
    /// or dropped. It runs on a runtime worker, so it must not block, and it
    /// may cancel its own handle.
    pub fn watch<F>(&self, scope: SessionScope, on_update: F) -> FeedHandle
    where
        F: FnMut(FeedUpdate) + Send + 'static,
    {
        FeedHandle::spawn(self.subscribe(scope), on_update)
    }

    /// Number of live feeds currently listening for changes.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Write timestamps strictly increase, even when the clock does not.
    fn next_stamp(&self) -> DateTime<Utc> {
        let mut last = self
            .last_stamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        let stamp = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}
