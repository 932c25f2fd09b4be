use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;

use super::analytics::get_user_analytics;
use super::handlers::{
    check_view_exists, create_log, create_view, get_user_stats, get_view_stats, health_check,
    list_logs, list_user_logs, list_views, not_found, service_info, AppState,
};

/// Largest JSON body accepted by any endpoint (10MB)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn create_api_router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    let engagement_logs = Router::new()
        .route("/health", get(health_check))
        .route("/", post(create_log).get(list_logs))
        .route("/user/{user_id}", get(list_user_logs))
        .route("/stats/user/{user_id}", get(get_user_stats))
        .route("/stats/views", get(get_view_stats))
        .route("/analytics/user/{user_id}", get(get_user_analytics))
        .route("/views", get(list_views).post(create_view))
        .route("/views/{view_name}", get(check_view_exists));

    Router::new()
        .route("/", get(service_info))
        .nest("/api/engagement-logs", engagement_logs)
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
