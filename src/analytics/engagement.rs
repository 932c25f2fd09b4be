//! Engagement metrics over a trailing window of days

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Week-over-week change (in percent) both metrics must exceed to count as a trend
pub const TREND_THRESHOLD_PERCENT: f64 = 10.0;

/// One observed viewing of a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSession {
    pub view_label: String,
    pub duration_seconds: u32,
    pub viewed_at: DateTime<Utc>,
}

/// Engagement on a single UTC calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub sessions: u64,
    pub duration: u64,
    pub unique_views: u64,
    pub avg_duration: f64,
}

impl DailyBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            sessions: 0,
            duration: 0,
            unique_views: 0,
            avg_duration: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTrend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub total_sessions: u64,
    pub total_duration: u64,
    pub avg_duration: f64,
    pub unique_views: u64,
    /// One bucket per day of the window, most recent day first
    pub daily_engagement: Vec<DailyBucket>,
    pub engagement_trend: EngagementTrend,
}

#[derive(Debug, Default, Clone, Copy)]
struct WeeklyAggregate {
    sessions: u64,
    duration: u64,
}

/// Compute engagement analytics for the `days` days ending at `now`.
///
/// Only sessions viewed at or after `now - days` contribute to any of the
/// metrics. `daily_engagement` always holds one bucket per calendar day from
/// today back to `days - 1` days ago, zero-filled where nothing was viewed.
pub fn compute_analytics(
    sessions: &[ViewSession],
    days: u32,
    now: DateTime<Utc>,
) -> AnalyticsResult {
    let cutoff = now
        .checked_sub_signed(TimeDelta::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let recent: Vec<&ViewSession> = sessions
        .iter()
        .filter(|session| session.viewed_at >= cutoff)
        .collect();

    let total_sessions = recent.len() as u64;
    let total_duration: u64 = recent
        .iter()
        .map(|session| u64::from(session.duration_seconds))
        .sum();
    let unique_views = recent
        .iter()
        .map(|session| session.view_label.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    AnalyticsResult {
        total_sessions,
        total_duration,
        avg_duration: average(total_duration, total_sessions),
        unique_views,
        daily_engagement: daily_engagement(&recent, days, now.date_naive()),
        engagement_trend: engagement_trend(&recent),
    }
}

fn average(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn daily_engagement(recent: &[&ViewSession], days: u32, today: NaiveDate) -> Vec<DailyBucket> {
    // Stops early only if the window reaches past the earliest representable date
    let mut buckets: Vec<DailyBucket> = (0..u64::from(days))
        .map_while(|offset| today.checked_sub_days(Days::new(offset)))
        .map(DailyBucket::empty)
        .collect();

    let index: HashMap<NaiveDate, usize> = buckets
        .iter()
        .enumerate()
        .map(|(i, bucket)| (bucket.date, i))
        .collect();
    let mut labels: Vec<HashSet<&str>> = vec![HashSet::new(); buckets.len()];

    for session in recent {
        if let Some(&i) = index.get(&session.viewed_at.date_naive()) {
            buckets[i].sessions += 1;
            buckets[i].duration += u64::from(session.duration_seconds);
            labels[i].insert(session.view_label.as_str());
        }
    }

    for (bucket, labels) in buckets.iter_mut().zip(labels) {
        bucket.unique_views = labels.len() as u64;
        bucket.avg_duration = average(bucket.duration, bucket.sessions);
    }

    buckets
}

/// Start of the Sunday-aligned week containing `date`
fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date.checked_sub_days(Days::new(offset))
        .unwrap_or(NaiveDate::MIN)
}

fn engagement_trend(recent: &[&ViewSession]) -> EngagementTrend {
    if recent.len() < 2 {
        return EngagementTrend::InsufficientData;
    }

    let mut weeks: BTreeMap<NaiveDate, WeeklyAggregate> = BTreeMap::new();
    for session in recent {
        let week = weeks
            .entry(week_start(session.viewed_at.date_naive()))
            .or_default();
        week.sessions += 1;
        week.duration += u64::from(session.duration_seconds);
    }

    let mut latest_first = weeks.values().rev();
    let (Some(current), Some(previous)) = (latest_first.next(), latest_first.next()) else {
        return EngagementTrend::InsufficientData;
    };

    classify(previous, current)
}

fn percent_change(previous: u64, current: u64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    Some((current as f64 - previous as f64) / previous as f64 * 100.0)
}

fn classify(previous: &WeeklyAggregate, current: &WeeklyAggregate) -> EngagementTrend {
    // A week only exists once it holds a session, so only the duration can be zero
    let (Some(session_change), Some(duration_change)) = (
        percent_change(previous.sessions, current.sessions),
        percent_change(previous.duration, current.duration),
    ) else {
        return EngagementTrend::Stable;
    };

    if session_change > TREND_THRESHOLD_PERCENT && duration_change > TREND_THRESHOLD_PERCENT {
        EngagementTrend::Increasing
    } else if session_change < -TREND_THRESHOLD_PERCENT
        && duration_change < -TREND_THRESHOLD_PERCENT
    {
        EngagementTrend::Decreasing
    } else {
        EngagementTrend::Stable
    }
}
