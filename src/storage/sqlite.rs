use crate::models::{
    EngagementLog, NewEngagementLog, UserEngagementStats, View, ViewEngagementStats,
};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

const SELECT_LOGS: &str = r#"
    SELECT e.id, e.user_id, e.view_id, v.view_name, e.duration_seconds, e.viewed_at, e.created_at
    FROM engagement_logs e
    LEFT JOIN views_available v ON e.view_id = v.id
"#;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn view_id_exists(&self, view_id: i64) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM views_available WHERE id = ?",
        )
        .bind(view_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count > 0)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS views_available (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                view_name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS engagement_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                view_id INTEGER NOT NULL REFERENCES views_available(id),
                duration_seconds INTEGER NOT NULL,
                viewed_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL
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
        if !self.view_id_exists(log.view_id).await? {
            return Err(StorageError::UnknownView(log.view_id));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO engagement_logs (user_id, view_id, duration_seconds, viewed_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.user_id)
        .bind(log.view_id)
        .bind(log.duration_seconds)
        .bind(log.viewed_at)
        .bind(log.created_at)
        .execute(self.pool.as_ref())
        .await?;

        let row = sqlx::query_as::<_, EngagementLog>(&format!("{SELECT_LOGS} WHERE e.id = ?"))
            .bind(result.last_insert_rowid())
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(row)
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EngagementLog>> {
        let logs = sqlx::query_as::<_, EngagementLog>(&format!(
            "{SELECT_LOGS} WHERE e.user_id = ? ORDER BY e.viewed_at DESC, e.id DESC LIMIT ? OFFSET ?"
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
            "{SELECT_LOGS} ORDER BY e.viewed_at DESC, e.id DESC LIMIT ? OFFSET ?"
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
                COALESCE(SUM(duration_seconds), 0) AS total_duration,
                COALESCE(AVG(duration_seconds), 0.0) AS avg_duration,
                COUNT(DISTINCT view_id) AS unique_views,
                MAX(viewed_at) AS last_activity
            FROM engagement_logs
            WHERE user_id = ?
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
                COALESCE(AVG(e.duration_seconds), 0.0) AS avg_duration
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
        let result = sqlx::query(
            r#"
            INSERT INTO views_available (view_name)
            VALUES (?)
            ON CONFLICT(view_name) DO NOTHING
            "#,
        )
        .bind(view_name)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        Ok(View {
            id: result.last_insert_rowid(),
            view_name: view_name.to_string(),
        })
    }

    async fn view_exists(&self, view_name: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM views_available WHERE view_name = ?",
        )
        .bind(view_name)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count > 0)
    }
}
