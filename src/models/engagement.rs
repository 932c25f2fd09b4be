use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::analytics::ViewSession;

/// Longest duration a single log may record (24 hours)
pub const MAX_DURATION_SECONDS: i64 = 86_400;

/// A stored engagement log row.
///
/// `view_name` is filled in by queries that join the views table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EngagementLog {
    pub id: i64,
    pub user_id: i64,
    pub view_id: i64,
    pub view_name: Option<String>,
    pub duration_seconds: i64,
    pub viewed_at: i64,
    pub created_at: i64,
}

impl EngagementLog {
    /// Convert the row into the input shape of the analytics calculator.
    ///
    /// Rows whose view no longer resolves to a name are labelled by view id.
    pub fn to_session(&self) -> ViewSession {
        ViewSession {
            view_label: self
                .view_name
                .clone()
                .unwrap_or_else(|| format!("view:{}", self.view_id)),
            duration_seconds: u32::try_from(self.duration_seconds).unwrap_or_default(),
            viewed_at: DateTime::from_timestamp(self.viewed_at, 0).unwrap_or_default(),
        }
    }
}

/// A validated log ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEngagementLog {
    pub user_id: i64,
    pub view_id: i64,
    pub duration_seconds: i64,
    pub viewed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateEngagementLogRequest {
    pub view_id: Option<i64>,
    pub duration_seconds: Option<i64>,
    /// RFC 3339 timestamp; defaults to the time the request is handled
    pub viewed_at: Option<DateTime<Utc>>,
}

impl CreateEngagementLogRequest {
    /// Check field presence and ranges, producing the row to insert.
    pub fn validate(self, user_id: i64, now: DateTime<Utc>) -> Result<NewEngagementLog, String> {
        let view_id = self
            .view_id
            .ok_or_else(|| "\"view_id\" is required".to_string())?;
        if view_id < 1 {
            return Err("\"view_id\" must be greater than or equal to 1".to_string());
        }

        let duration_seconds = self
            .duration_seconds
            .ok_or_else(|| "\"duration_seconds\" is required".to_string())?;
        if duration_seconds < 0 {
            return Err("\"duration_seconds\" must be greater than or equal to 0".to_string());
        }
        if duration_seconds > MAX_DURATION_SECONDS {
            return Err(format!(
                "\"duration_seconds\" must be less than or equal to {MAX_DURATION_SECONDS}"
            ));
        }

        Ok(NewEngagementLog {
            user_id,
            view_id,
            duration_seconds,
            viewed_at: self.viewed_at.unwrap_or(now).timestamp(),
            created_at: now.timestamp(),
        })
    }
}

/// Aggregate statistics over every log of a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserEngagementStats {
    pub total_sessions: i64,
    pub total_duration: i64,
    pub avg_duration: f64,
    pub unique_views: i64,
    pub last_activity: Option<i64>,
}

/// Per-view statistics across all users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ViewEngagementStats {
    pub view_name: String,
    pub total_views: i64,
    pub avg_duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn request(view_id: Option<i64>, duration: Option<i64>) -> CreateEngagementLogRequest {
        CreateEngagementLogRequest {
            view_id,
            duration_seconds: duration,
            viewed_at: None,
        }
    }

    #[test]
    fn test_validate_defaults_viewed_at_to_now() {
        let log = request(Some(3), Some(300)).validate(123, now()).unwrap();

        assert_eq!(log.user_id, 123);
        assert_eq!(log.view_id, 3);
        assert_eq!(log.duration_seconds, 300);
        assert_eq!(log.viewed_at, now().timestamp());
        assert_eq!(log.created_at, now().timestamp());
    }

    #[test]
    fn test_validate_keeps_explicit_viewed_at() {
        let viewed_at = Utc.with_ymd_and_hms(2024, 1, 10, 8, 30, 0).unwrap();
        let req = CreateEngagementLogRequest {
            viewed_at: Some(viewed_at),
            ..request(Some(1), Some(0))
        };

        let log = req.validate(1, now()).unwrap();
        assert_eq!(log.viewed_at, viewed_at.timestamp());
        assert_eq!(log.created_at, now().timestamp());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let err = request(None, Some(10)).validate(1, now()).unwrap_err();
        assert!(err.contains("view_id"));

        let err = request(Some(1), None).validate(1, now()).unwrap_err();
        assert!(err.contains("duration_seconds"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        assert!(request(Some(0), Some(10)).validate(1, now()).is_err());
        assert!(request(Some(1), Some(-1)).validate(1, now()).is_err());
        assert!(request(Some(1), Some(100_000)).validate(1, now()).is_err());
        assert!(request(Some(1), Some(MAX_DURATION_SECONDS))
            .validate(1, now())
            .is_ok());
    }

    #[test]
    fn test_to_session_falls_back_to_view_id_label() {
        let log = EngagementLog {
            id: 1,
            user_id: 1,
            view_id: 7,
            view_name: None,
            duration_seconds: 42,
            viewed_at: now().timestamp(),
            created_at: now().timestamp(),
        };

        let session = log.to_session();
        assert_eq!(session.view_label, "view:7");
        assert_eq!(session.duration_seconds, 42);
        assert_eq!(session.viewed_at, now());
    }
}
