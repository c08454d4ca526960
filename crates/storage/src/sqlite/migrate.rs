use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies versioned schema migrations.
///
/// Each version runs once inside its own transaction and is recorded in
/// `schema_migrations`. Later record fields arrive as a new version that adds
/// a nullable column; rows written before it read back with the field unset.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: session records.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        // `seq` preserves write order; `id` is the public identity.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sessions (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    activator_name TEXT NOT NULL,
                    association TEXT NOT NULL,
                    school TEXT NOT NULL,
                    date TEXT NOT NULL,
                    time TEXT NOT NULL,
                    class_period TEXT,
                    year_groups TEXT NOT NULL,
                    male_students INTEGER NOT NULL CHECK (male_students >= 0),
                    female_students INTEGER NOT NULL CHECK (female_students >= 0),
                    session_length TEXT NOT NULL,
                    teacher_engagement TEXT NOT NULL,
                    session_type TEXT NOT NULL,
                    latitude REAL,
                    longitude REAL,
                    submitted_by TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sessions_created
                    ON sessions (created_at, seq);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sessions_submitter_created
                    ON sessions (submitted_by, created_at, seq);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
