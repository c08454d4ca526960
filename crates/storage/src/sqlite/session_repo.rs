use activator_core::model::{NewSession, SessionId, SessionRecord};
use chrono::{DateTime, Utc};

use super::SqliteRepository;
use super::mapping::{encode_year_groups, map_session_row};
use crate::repository::{SessionRepository, SessionScope, StorageError};

const SESSION_COLUMNS: &str = r"
    id, activator_name, association, school, date, time, class_period,
    year_groups, male_students, female_students, session_length,
    teacher_engagement, session_type, latitude, longitude, submitted_by,
    created_at
";

fn map_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<SessionRecord>, StorageError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(map_session_row(&row)?);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(
        &self,
        session: &NewSession,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StorageError> {
        let id = SessionId::generate();
        let draft = session.to_draft();
        let year_groups = encode_year_groups(&draft.year_groups)?;

        sqlx::query(
            r"
                INSERT INTO sessions (
                    id, activator_name, association, school, date, time,
                    class_period, year_groups, male_students, female_students,
                    session_length, teacher_engagement, session_type,
                    latitude, longitude, submitted_by, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ",
        )
        .bind(id.to_string())
        .bind(draft.activator_name)
        .bind(draft.association)
        .bind(draft.school)
        .bind(draft.date)
        .bind(draft.time)
        .bind(draft.class_period)
        .bind(year_groups)
        .bind(draft.male_students)
        .bind(draft.female_students)
        .bind(draft.session_length)
        .bind(draft.teacher_engagement)
        .bind(draft.session_type)
        .bind(draft.geolocation.map(|g| g.lat))
        .bind(draft.geolocation.map(|g| g.lng))
        .bind(draft.user_id)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => StorageError::Connection(other.to_string()),
        })?;

        tracing::debug!(%id, "inserted session row");
        Ok(id)
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_session_row(&row)
    }

    async fn list_recent(
        &self,
        scope: &SessionScope,
        limit: u32,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions");
        let mut bind_index = 1;
        if matches!(scope, SessionScope::Submitter(_)) {
            sql.push_str(" WHERE submitted_by = ?1");
            bind_index += 1;
        }
        sql.push_str(" ORDER BY created_at DESC, seq DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql);
        if let SessionScope::Submitter(user) = scope {
            query = query.bind(user.as_str().to_owned());
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        map_rows(rows)
    }

    async fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY seq ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        map_rows(rows)
    }

    async fn change_cursor(&self, scope: &SessionScope) -> Result<i64, StorageError> {
        // `seq` only grows, so its maximum moves with every insert from any connection.
        let query = match scope {
            SessionScope::All => {
                sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(seq), 0) FROM sessions")
            }
            SessionScope::Submitter(user) => sqlx::query_scalar::<_, i64>(
                "SELECT COALESCE(MAX(seq), 0) FROM sessions WHERE submitted_by = ?1",
            )
            .bind(user.as_str().to_owned()),
        };
        query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}
