mod analytics;
mod error;
mod handlers;
mod routes;

pub use error::{ApiError, ApiResult};
pub use handlers::{ApiResponse, AppState, Pagination};
pub use routes::create_api_router;
