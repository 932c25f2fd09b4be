use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{StatusCode, Uri},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use crate::analytics::Clock;
use crate::auth::{parse_user_id, UserId};
use crate::config::AnalyticsConfig;
use crate::models::{
    CreateEngagementLogRequest, CreateViewRequest, EngagementLog, UserEngagementStats, View,
    ViewEngagementStats,
};
use crate::storage::{Storage, StorageError};

const DEFAULT_PAGE_LIMIT: i64 = 100;
const MAX_PAGE_LIMIT: i64 = 1000;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub clock: Arc<dyn Clock>,
    pub analytics: AnalyticsConfig,
}

/// Envelope wrapped around every successful response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            pagination: None,
        }
    }

    fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub count: usize,
}

/// Raw pagination parameters, validated by [`ListQuery::page`]
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListQuery {
    fn page(&self) -> ApiResult<(i64, i64)> {
        let limit = match self.limit.as_deref() {
            None => DEFAULT_PAGE_LIMIT,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => limit,
                _ => {
                    return Err(ApiError::Validation(format!(
                        "\"limit\" must be an integer between 1 and {MAX_PAGE_LIMIT}"
                    )))
                }
            },
        };

        let offset = match self.offset.as_deref() {
            None => 0,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(offset) if offset >= 0 => offset,
                _ => {
                    return Err(ApiError::Validation(
                        "\"offset\" must be a non-negative integer".to_string(),
                    ))
                }
            },
        };

        Ok((limit, offset))
    }
}

/// Service description at the root path
pub async fn service_info() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Engagement Service API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "engagement_logs": "/api/engagement-logs",
            "health": "/api/engagement-logs/health",
        },
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Engagement Log Service is healthy",
        "timestamp": state.clock.now().to_rfc3339(),
        "service": "engagement-logs",
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Record a new engagement log for the calling user
pub async fn create_log(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    payload: Result<Json<CreateEngagementLogRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<EngagementLog>>)> {
    let Json(payload) = payload?;
    let new_log = payload
        .validate(user_id, state.clock.now())
        .map_err(ApiError::Validation)?;

    let log = state.storage.create_log(&new_log).await?;
    tracing::info!(
        user_id,
        view_id = log.view_id,
        duration_seconds = log.duration_seconds,
        "engagement log created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Engagement log created successfully", log)),
    ))
}

/// List every engagement log
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<EngagementLog>>>> {
    let (limit, offset) = query.page()?;
    let logs = state.storage.list_all(limit, offset).await?;
    let count = logs.len();

    Ok(Json(
        ApiResponse::new(format!("Retrieved {count} engagement logs"), logs).with_pagination(
            Pagination {
                limit,
                offset,
                count,
            },
        ),
    ))
}

/// List one user's engagement logs
pub async fn list_user_logs(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<EngagementLog>>>> {
    let user_id = parse_user_id(&user_id)?;
    let (limit, offset) = query.page()?;
    let logs = state.storage.list_by_user(user_id, limit, offset).await?;
    let count = logs.len();

    Ok(Json(
        ApiResponse::new(
            format!("Retrieved {count} engagement logs for user {user_id}"),
            logs,
        )
        .with_pagination(Pagination {
            limit,
            offset,
            count,
        }),
    ))
}

pub async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserEngagementStats>>> {
    let user_id = parse_user_id(&user_id)?;
    let stats = state.storage.user_stats(user_id).await?;

    Ok(Json(ApiResponse::new(
        format!("Retrieved engagement stats for user {user_id}"),
        stats,
    )))
}

pub async fn get_view_stats(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<Vec<ViewEngagementStats>>>> {
    let stats = state.storage.view_stats().await?;

    Ok(Json(ApiResponse::new(
        "Retrieved view engagement statistics",
        stats,
    )))
}

pub async fn list_views(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<Vec<View>>>> {
    let views = state.storage.list_views().await?;
    Ok(Json(ApiResponse::new("Retrieved available views", views)))
}

/// Register a new view name
pub async fn create_view(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateViewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<View>>)> {
    let Json(payload) = payload?;

    let view_name = payload
        .view_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            ApiError::Validation("View name is required and must be a non-empty string".to_string())
        })?;

    let view = match state.storage.create_view(view_name).await {
        Ok(view) => view,
        Err(StorageError::Conflict) => return Err(ApiError::ViewExists(view_name.to_string())),
        Err(e) => return Err(e.into()),
    };
    tracing::info!(view_id = view.id, view_name = %view.view_name, "view created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            format!("View \"{}\" created successfully", view.view_name),
            view,
        )),
    ))
}

pub async fn check_view_exists(
    State(state): State<Arc<AppState>>,
    Path(view_name): Path<String>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let exists = state.storage.view_exists(&view_name).await?;
    let message = format!(
        "View \"{view_name}\" {}",
        if exists { "exists" } else { "does not exist" }
    );

    Ok(Json(ApiResponse::new(
        message,
        json!({ "exists": exists, "view_name": view_name }),
    )))
}
