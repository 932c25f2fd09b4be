mod engagement;
mod view;

pub use engagement::{
    CreateEngagementLogRequest, EngagementLog, NewEngagementLog, UserEngagementStats,
    ViewEngagementStats, MAX_DURATION_SECONDS,
};
pub use view::{CreateViewRequest, View};
