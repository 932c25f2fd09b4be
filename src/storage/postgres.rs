use crate::models::{
    EngagementLog, NewEngagementLog, UserEngagementStats, View, ViewEngagementStats,
};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

const SELECT_LOGS: &str = r#"
    SELECT e.id, e.user_id, e.view_id, v.view_name, e.duration_seconds, e.viewed_at, e.created_at
    FROM engagement_logs e
    LEFT JOIN views_available v ON e.view_id = v.id
"#;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS views_available (
                id BIGSERIAL PRIMARY KEY,
                view_name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS engagement_logs (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                view_id BIGINT NOT NULL REFERENCES views_available(id),
                duration_seconds BIGINT NOT NULL,
                viewed_at BIGINT NOT NULL,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_engagement_logs_user ON engagement_logs(user_id, viewed_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_engagement_logs_viewed_at ON engagement_logs(viewed_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_log(&self, log: &NewEngagementLog) -> StorageResult<EngagementLog> {
        let view_name = sqlx::query_scalar::<_, String>(
            "SELECT view_name FROM views_available WHERE id = $1",
        )
        .bind(log.view_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        let Some(view_name) = view_name else {
            return Err(StorageError::UnknownView(log.view_id));
        };


        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO engagement_logs (user_id, view_id, duration_seconds, viewed_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(log.user_id)
        .bind(log.view_id)
        .bind(log.duration_seconds)
        .bind(log.viewed_at)
        .bind(log.created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(EngagementLog {
            id,
            user_id: log.user_id,
            view_id: log.view_id,
            view_name: Some(view_name),
            duration_seconds: log.duration_seconds,
            viewed_at: log.viewed_at,
            created_at: log.created_at,
        })
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EngagementLog>> {
        let logs = sqlx::query_as::<_, EngagementLog>(&format!(
            "{SELECT_LOGS} WHERE e.user_id = $1 ORDER BY e.viewed_at DESC, e.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(logs)
    }

    async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<EngagementLog>> {
        let logs = sqlx::query_as::<_, EngagementLog>(&format!(
            "{SELECT_LOGS} ORDER BY e.viewed_at DESC, e.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(logs)
    }

    async fn user_stats(&self, user_id: i64) -> Result<UserEngagementStats> {
        let stats = sqlx::query_as::<_, UserEngagementStats>(
            r#"
            SELECT
                COUNT(*) AS total_sessions,
                COALESCE(SUM(duration_seconds), 0)::BIGINT AS total_duration,
                COALESCE(AVG(duration_seconds), 0)::DOUBLE PRECISION AS avg_duration,
                COUNT(DISTINCT view_id) AS unique_views,
                MAX(viewed_at) AS last_activity
            FROM engagement_logs
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(stats)
    }

    async fn view_stats(&self) -> Result<Vec<ViewEngagementStats>> {
        let stats = sqlx::query_as::<_, ViewEngagementStats>(
            r#"
            SELECT
                v.view_name AS view_name,
                COUNT(e.id) AS total_views,
                COALESCE(AVG(e.duration_seconds), 0)::DOUBLE PRECISION AS avg_duration
            FROM engagement_logs e
            JOIN views_available v ON e.view_id = v.id
            GROUP BY v.view_name
            ORDER BY total_views DESC, v.view_name ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(stats)
    }

    async fn list_views(&self) -> Result<Vec<View>> {
        let views = sqlx::query_as::<_, View>(
            "SELECT id, view_name FROM views_available ORDER BY id ASC",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(views)
    }

    async fn create_view(&self, view_name: &str) -> StorageResult<View> {
        let view = sqlx::query_as::<_, View>(
            r#"
            INSERT INTO views_available (view_name)
            VALUES ($1)
            ON CONFLICT (view_name) DO NOTHING
            RETURNING id, view_name
            "#,
        )
        .bind(view_name)
        .fetch_optional(self.pool.as_ref())
        .await?;

        view.ok_or(StorageError::Conflict)
    }

    async fn view_exists(&self, view_name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM views_available WHERE view_name = $1)",
        )
        .bind(view_name)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }
}
