use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An application section whose viewing time is tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct View {
    pub id: i64,
    pub view_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateViewRequest {
    pub view_name: Option<String>,
}
