use activator_core::model::{NewSession, SessionId, SessionRecord, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Which records a recent-sessions query covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionScope {
    #[default]
    All,
    Submitter(UserId),
}

impl SessionScope {
    #[must_use]
    pub fn matches(&self, submitted_by: &UserId) -> bool {
        match self {
            SessionScope::All => true,
            SessionScope::Submitter(user) => user == submitted_by,
        }
    }
}

/// Repository contract for session records.
///
/// Records are append-only: there is no update or delete path.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session stamped with `created_at` and return its fresh id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn insert_session(
        &self,
        session: &NewSession,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StorageError>;

    /// Fetch one record by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError>;

    /// Newest-first records within `scope`, at most `limit` of them.
    ///
    /// Ties on `created_at` resolve newest write first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or decoding failures.
    async fn list_recent(
        &self,
        scope: &SessionScope,
        limit: u32,
    ) -> Result<Vec<SessionRecord>, StorageError>;

    /// Every record, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or decoding failures.
    async fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError>;

    /// Marker that grows whenever a record lands in `scope`, whichever
    /// process wrote it. Zero while the scope is empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn change_cursor(&self, scope: &SessionScope) -> Result<i64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<Vec<SessionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(
        &self,
        session: &NewSession,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = SessionId::generate();
        if guard.iter().any(|r| r.id() == id) {
            return Err(StorageError::Conflict);
        }
        guard.push(SessionRecord::new(id, created_at, session.clone()));
        Ok(id)
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_recent(
        &self,
        scope: &SessionScope,
        limit: u32,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // Walking the insertion log backwards makes later writes win ties.
        let mut out: Vec<SessionRecord> = guard
            .iter()
            .rev()
            .filter(|r| scope.matches(r.session().submitted_by()))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn change_cursor(&self, scope: &SessionScope) -> Result<i64, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // Position in the append-only log of the newest matching record.
        let position = guard
            .iter()
            .rposition(|r| scope.matches(r.session().submitted_by()))
            .map_or(0, |idx| idx + 1);
        i64::try_from(position).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Bundles repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use activator_core::model::SessionDraft;
    use activator_core::time::fixed_now;
    use chrono::Duration;

    fn build_session(school: &str, user: &str) -> NewSession {
        SessionDraft {
            activator_name: "Emma Wilson".into(),
            association: "canterbury".into(),
            school: school.into(),
            date: "2024-02-06".into(),
            time: "09:00".into(),
            class_period: None,
            year_groups: vec!["Year 4".into()],
            male_students: 10,
            female_students: 8,
            session_length: "30".into(),
            teacher_engagement: "moderate".into(),
            session_type: "other".into(),
            geolocation: None,
            user_id: user.into(),
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_capped() {
        let repo = InMemoryRepository::new();
        for i in 0..5 {
            let at = fixed_now() + Duration::minutes(i);
            repo.insert_session(&build_session(&format!("School {i}"), "u1"), at)
                .await
                .unwrap();
        }

        let recent = repo.list_recent(&SessionScope::All, 3).await.unwrap();
        let schools: Vec<&str> = recent.iter().map(|r| r.session().school()).collect();
        assert_eq!(schools, vec!["School 4", "School 3", "School 2"]);
    }

    #[tokio::test]
    async fn equal_timestamps_resolve_to_latest_write() {
        let repo = InMemoryRepository::new();
        repo.insert_session(&build_session("First", "u1"), fixed_now())
            .await
            .unwrap();
        repo.insert_session(&build_session("Second", "u1"), fixed_now())
            .await
            .unwrap();

        let recent = repo.list_recent(&SessionScope::All, 10).await.unwrap();
        assert_eq!(recent[0].session().school(), "Second");
    }

    #[tokio::test]
    async fn submitter_scope_filters_records() {
        let repo = InMemoryRepository::new();
        repo.insert_session(&build_session("A", "u1"), fixed_now())
            .await
            .unwrap();
        repo.insert_session(&build_session("B", "u2"), fixed_now())
            .await
            .unwrap();

        let scope = SessionScope::Submitter(UserId::new("u2").unwrap());
        let mine = repo.list_recent(&scope, 50).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].session().school(), "B");
    }

    #[tokio::test]
    async fn change_cursor_moves_only_for_in_scope_writes() {
        let repo = InMemoryRepository::new();
        let mine = SessionScope::Submitter(UserId::new("u1").unwrap());
        assert_eq!(repo.change_cursor(&mine).await.unwrap(), 0);

        repo.insert_session(&build_session("A", "u1"), fixed_now())
            .await
            .unwrap();
        let after_own = repo.change_cursor(&mine).await.unwrap();
        repo.insert_session(&build_session("B", "u2"), fixed_now())
            .await
            .unwrap();

        assert!(after_own > 0);
        assert_eq!(repo.change_cursor(&mine).await.unwrap(), after_own);
        assert!(repo.change_cursor(&SessionScope::All).await.unwrap() > after_own);
    }

    #[tokio::test]
    async fn list_all_keeps_insertion_order() {
        let repo = InMemoryRepository::new();
        let late = fixed_now() + Duration::hours(1);
        repo.insert_session(&build_session("Late", "u1"), late)
            .await
            .unwrap();
        repo.insert_session(&build_session("Early", "u1"), fixed_now())
            .await
            .unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all[0].session().school(), "Late");
        assert_eq!(all[1].session().school(), "Early");
    }

    #[tokio::test]
    async fn get_session_reports_missing_ids() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_session(&build_session("A", "u1"), fixed_now())
            .await
            .unwrap();
        assert_eq!(repo.get_session(id).await.unwrap().id(), id);
        assert!(matches!(
            repo.get_session(SessionId::generate()).await,
            Err(StorageError::NotFound)
        ));
    }
}
