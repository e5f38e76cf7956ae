//! Portfolio visit analytics. Aggregation is a pure function over visit rows.

pub mod handlers;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::visit::VisitRow;

pub const DEFAULT_SERIES_DAYS: u32 = 30;
pub const MAX_SERIES_DAYS: u32 = 90;
pub const UNKNOWN_LOCATION: &str = "unknown";

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitTotals {
    pub last_24h: u64,
    pub last_7d: u64,
    pub last_30d: u64,
    pub all_time: u64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub totals: VisitTotals,
    pub by_location: BTreeMap<String, u64>,
    pub by_role: BTreeMap<String, u64>,
    pub daily: Vec<DailyCount>,
}

pub fn clamp_days(requested: Option<u32>) -> u32 {
    requested
        .filter(|d| *d > 0)
        .unwrap_or(DEFAULT_SERIES_DAYS)
        .min(MAX_SERIES_DAYS)
}

/// Aggregates `visits` as seen at `now`. The daily series covers the `days`
/// calendar days (UTC) ending today, oldest first, with empty days as zero.
pub fn summarize(visits: &[VisitRow], now: DateTime<Utc>, days: u32) -> AnalyticsSummary {
    let days = days.clamp(1, MAX_SERIES_DAYS);
    let today = now.date_naive();
    let first_day = today - Duration::days(i64::from(days) - 1);

    let mut totals = VisitTotals::default();
    let mut by_location = BTreeMap::new();
    let mut by_role = BTreeMap::new();
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    for visit in visits {
        let age = now - visit.visited_at;
        totals.all_time += 1;
        if age <= Duration::hours(24) {
            totals.last_24h += 1;
        }
        if age <= Duration::days(7) {
            totals.last_7d += 1;
        }
        if age <= Duration::days(30) {
            totals.last_30d += 1;
        }

        let location = visit
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(UNKNOWN_LOCATION);
        *by_location.entry(location.to_string()).or_insert(0) += 1;
        *by_role.entry(visit.viewer_role.clone()).or_insert(0) += 1;

        let day = visit.visited_at.date_naive();
        if day >= first_day && day <= today {
            *per_day.entry(day).or_insert(0) += 1;
        }
    }

    let daily = first_day
        .iter_days()
        .take(days as usize)
        .map(|date| DailyCount {
            date,
            count: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect();

    AnalyticsSummary {
        totals,
        by_location,
        by_role,
        daily,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn visit(at: DateTime<Utc>, role: &str, location: Option<&str>) -> VisitRow {
        VisitRow {
            id: Uuid::new_v4(),
            profile_user_id: Uuid::nil(),
            viewer_role: role.to_string(),
            viewer_id: None,
            location: location.map(str::to_string),
            visited_at: at,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_window_totals() {
        let now = now();
        let visits = vec![
            visit(now - Duration::hours(1), "anonymous", Some("Berlin")),
            visit(now - Duration::days(3), "recruiter", Some("Paris")),
            visit(now - Duration::days(20), "student", None),
            visit(now - Duration::days(200), "anonymous", Some("  ")),
        ];
        let summary = summarize(&visits, now, 30);
        assert_eq!(
            summary.totals,
            VisitTotals {
                last_24h: 1,
                last_7d: 2,
                last_30d: 3,
                all_time: 4,
            }
        );
        assert_eq!(summary.by_location[UNKNOWN_LOCATION], 2);
        assert_eq!(summary.by_location["Berlin"], 1);
        assert_eq!(summary.by_role["anonymous"], 2);
        assert_eq!(summary.by_role["recruiter"], 1);
    }

    #[test]
    fn test_daily_series_is_zero_filled() {
        let now = now();
        let visits = vec![
            visit(now, "anonymous", None),
            visit(now - Duration::minutes(30), "anonymous", None),
            visit(now - Duration::days(2), "student", None),
            visit(now - Duration::days(10), "student", None),
        ];
        let summary = summarize(&visits, now, 7);
        assert_eq!(summary.daily.len(), 7);
        assert_eq!(
            summary.daily.first().map(|d| d.date),
            NaiveDate::from_ymd_opt(2024, 6, 9)
        );
        assert_eq!(summary.daily.last().map(|d| d.count), Some(2));
        assert_eq!(summary.daily[4].count, 1);
        assert_eq!(summary.daily.iter().map(|d| d.count).sum::<u64>(), 3);
    }

    #[test]
    fn test_empty_input() {
        let summary = summarize(&[], now(), 30);
        assert_eq!(summary.totals, VisitTotals::default());
        assert_eq!(summary.daily.len(), 30);
        assert!(summary.daily.iter().all(|d| d.count == 0));
        assert!(summary.by_role.is_empty());
    }

    #[test]
    fn test_clamp_days() {
        assert_eq!(clamp_days(None), DEFAULT_SERIES_DAYS);
        assert_eq!(clamp_days(Some(0)), DEFAULT_SERIES_DAYS);
        assert_eq!(clamp_days(Some(7)), 7);
        assert_eq!(clamp_days(Some(365)), MAX_SERIES_DAYS);
    }
}
