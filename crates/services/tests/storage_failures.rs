use std::sync::Arc;
use std::time::Duration;

use activator_core::model::{NewSession, SessionDraft, SessionId, SessionRecord};
use activator_core::time::fixed_clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use services::config::FeedConfig;
use services::{AnalyticsService, FeedUpdate, SessionScope, SessionStore, SubmitError};
use storage::repository::{SessionRepository, StorageError};

/// Every call fails as if the database had gone away.
struct UnreachableRepository;

fn unreachable() -> StorageError {
    StorageError::Connection("database unreachable".into())
}

#[async_trait]
impl SessionRepository for UnreachableRepository {
    async fn insert_session(
        &self,
        _session: &NewSession,
        _created_at: DateTime<Utc>,
    ) -> Result<SessionId, StorageError> {
        Err(unreachable())
    }

    async fn get_session(&self, _id: SessionId) -> Result<SessionRecord, StorageError> {
        Err(unreachable())
    }

    async fn list_recent(
        &self,
        _scope: &SessionScope,
        _limit: u32,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        Err(unreachable())
    }

    async fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        Err(unreachable())
    }

    async fn change_cursor(&self, _scope: &SessionScope) -> Result<i64, StorageError> {
        Err(unreachable())
    }
}

fn draft() -> SessionDraft {
    SessionDraft {
        activator_name: "Emma Wilson".into(),
        association: "canterbury".into(),
        school: "Riccarton Primary".into(),
        date: "2024-02-08".into(),
        time: "13:15".into(),
        class_period: None,
        year_groups: vec!["Year 4".into()],
        male_students: 11,
        female_students: 7,
        session_length: "30".into(),
        teacher_engagement: "high".into(),
        session_type: "other".into(),
        geolocation: None,
        user_id: "coach-9".into(),
    }
}

#[tokio::test]
async fn submit_reports_write_failure() {
    let store = SessionStore::new(
        fixed_clock(),
        Arc::new(UnreachableRepository),
        FeedConfig::default(),
    );

    let err = store.submit(draft()).await.unwrap_err();

    assert!(matches!(err, SubmitError::Write(StorageError::Connection(_))));
}

#[tokio::test]
async fn feed_reports_failure_once_then_ends() {
    let store = SessionStore::new(
        fixed_clock(),
        Arc::new(UnreachableRepository),
        FeedConfig::default(),
    );
    let mut feed = store.subscribe(SessionScope::All);

    let first = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .unwrap();
    assert!(matches!(first, Some(FeedUpdate::Failed(_))));

    let second = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .unwrap();
    assert!(second.is_none());
}

#[tokio::test]
async fn aggregation_fails_without_partial_result() {
    let analytics = AnalyticsService::new(Arc::new(UnreachableRepository));

    let err = analytics.compute_summary().await.unwrap_err();
    assert!(matches!(err.0, StorageError::Connection(_)));

    let filter = services::DashboardFilter::default();
    assert!(analytics.compute_breakdown(&filter).await.is_err());
}
