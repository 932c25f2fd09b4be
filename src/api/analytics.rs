//! Analytics API handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::handlers::{ApiResponse, AppState};
use crate::analytics::{compute_analytics, AnalyticsResult};
use crate::auth::parse_user_id;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQueryParams {
    /// Lookback window in days
    pub days: Option<String>,
}

impl AnalyticsQueryParams {
    fn days(&self, default_days: u32, max_days: u32) -> ApiResult<u32> {
        let Some(raw) = self.days.as_deref() else {
            return Ok(default_days);
        };

        match raw.trim().parse::<u32>() {
            Ok(days) if (1..=max_days).contains(&days) => Ok(days),
            _ => Err(ApiError::Validation(format!(
                "\"days\" must be an integer between 1 and {max_days}"
            ))),
        }
    }
}

/// Engagement analytics for one user over a trailing window
pub async fn get_user_analytics(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(params): Query<AnalyticsQueryParams>,
) -> ApiResult<Json<ApiResponse<AnalyticsResult>>> {
    let user_id = parse_user_id(&user_id)?;
    let days = params.days(state.analytics.default_days, state.analytics.max_days)?;

    let sessions: Vec<_> = state
        .storage
        .list_by_user(user_id, state.analytics.fetch_limit, 0)
        .await?
        .iter()
        .map(|log| log.to_session())
        .collect();

    let result = compute_analytics(&sessions, days, state.clock.now());
    tracing::debug!(
        user_id,
        days,
        fetched = sessions.len(),
        total_sessions = result.total_sessions,
        "computed engagement analytics"
    );

    Ok(Json(ApiResponse::new(
        format!("Retrieved engagement analytics for user {user_id} (last {days} days)"),
        result,
    )))
}
