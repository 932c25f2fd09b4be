use crate::models::{
    EngagementLog, NewEngagementLog, UserEngagementStats, View, ViewEngagementStats,
};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("view already exists")]
    Conflict,
    #[error("view {0} does not exist")]
    UnknownView(i64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Other(err.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Insert an engagement log. Fails with `UnknownView` when the view id is not registered.
    async fn create_log(&self, log: &NewEngagementLog) -> StorageResult<EngagementLog>;

    /// A user's logs, most recent first
    async fn list_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EngagementLog>>;

    /// Every log, most recent first
    async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<EngagementLog>>;

    /// Aggregate statistics over all of a user's logs
    async fn user_stats(&self, user_id: i64) -> Result<UserEngagementStats>;

    /// Per-view totals across all users
    async fn view_stats(&self) -> Result<Vec<ViewEngagementStats>>;

    async fn list_views(&self) -> Result<Vec<View>>;

    /// Register a new view. Fails with `Conflict` when the name is taken.
    async fn create_view(&self, view_name: &str) -> StorageResult<View>;

    async fn view_exists(&self, view_name: &str) -> Result<bool>;
}
