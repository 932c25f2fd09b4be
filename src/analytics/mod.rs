//! Engagement analytics
//!
//! Turns a user's raw view sessions into aggregate totals, a per-day
//! breakdown over a lookback window and a week-over-week trend.
//!
//! Everything here is a pure computation over rows already fetched by the
//! storage layer. The current time is supplied through [`Clock`] so results
//! are reproducible in tests.

pub mod clock;
pub mod engagement;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engagement::{
    compute_analytics, AnalyticsResult, DailyBucket, EngagementTrend, ViewSession,
    TREND_THRESHOLD_PERCENT,
};
