use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use timesheet_domain::{ActivityState, TrackingSession, User};

/// Bucket granularity for [`chart_data`] (§4.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartGranularity {
    Day,
    /// ISO week, Monday start.
    Week,
    Month,
    Year,
}

/// One time-series point. Present even when no sessions fall in the bucket
/// so consumers can render a contiguous series without gap-filling.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBucket {
    pub bucket_start: NaiveDate,
    pub work_hours: f64,
    pub commute_hours: f64,
    pub lunch_hours: f64,
    pub total_span_hours: f64,
    pub idle_hours: f64,
}

fn bucket_start(date: NaiveDate, granularity: ChartGranularity) -> NaiveDate {
    match granularity {
        ChartGranularity::Day => date,
        ChartGranularity::Week => {
            let iso = date.iso_week();
            NaiveDate::from_isoywd_opt(iso.year(), iso.week(), chrono::Weekday::Mon)
                .expect("ISO week start always resolves to a valid date")
        }
        ChartGranularity::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .expect("first of month is always valid"),
        ChartGranularity::Year => {
            NaiveDate::from_ymd_opt(date.year(), 1, 1).expect("Jan 1 is always valid")
        }
    }
}

/// Enumerate every bucket start in `[from, to]` inclusive so empty buckets
/// are still represented.
fn bucket_starts(from: NaiveDate, to: NaiveDate, granularity: ChartGranularity) -> Vec<NaiveDate> {
    let mut starts = Vec::new();
    let mut cursor = bucket_start(from, granularity);
    let last = bucket_start(to, granularity);
    while cursor <= last {
        starts.push(cursor);
        cursor = match granularity {
            ChartGranularity::Day => cursor.succ_opt().expect("date in range"),
            ChartGranularity::Week => cursor + chrono::Duration::days(7),
            ChartGranularity::Month => {
                if cursor.month() == 12 {
                    NaiveDate::from_ymd_opt(cursor.year() + 1, 1, 1).unwrap()
                } else {
                    NaiveDate::from_ymd_opt(cursor.year(), cursor.month() + 1, 1).unwrap()
                }
            }
            ChartGranularity::Year => NaiveDate::from_ymd_opt(cursor.year() + 1, 1, 1).unwrap(),
        };
    }
    starts
}

/// Bucket closed sessions into a zero-filled time series (§4.3.4).
#[must_use]
pub fn chart_data(
    user: &User,
    sessions: &[TrackingSession],
    from: NaiveDate,
    to: NaiveDate,
    granularity: ChartGranularity,
) -> Vec<ChartBucket> {
    let mut by_bucket: BTreeMap<NaiveDate, Vec<&TrackingSession>> = BTreeMap::new();
    for session in sessions {
        if session.ended_at.is_none() {
            continue;
        }
        let local_date = user.local_date(session.started_at);
        let bucket = bucket_start(local_date, granularity);
        by_bucket.entry(bucket).or_default().push(session);
    }

    bucket_starts(from, to, granularity)
        .into_iter()
        .map(|start| match by_bucket.get(&start) {
            Some(bucket_sessions) => summarize_bucket(start, bucket_sessions),
            None => ChartBucket {
                bucket_start: start,
                work_hours: 0.0,
                commute_hours: 0.0,
                lunch_hours: 0.0,
                total_span_hours: 0.0,
                idle_hours: 0.0,
            },
        })
        .collect()
}

fn summarize_bucket(start: NaiveDate, sessions: &[&TrackingSession]) -> ChartBucket {
    let sum_state = |state: ActivityState| -> f64 {
        sessions
            .iter()
            .filter(|s| s.state == state)
            .filter_map(|s| s.duration_hours())
            .sum()
    };

    let work_hours = sum_state(ActivityState::Working);
    let commute_hours = sum_state(ActivityState::Commuting);
    let lunch_hours = sum_state(ActivityState::Lunch);

    let earliest = sessions.iter().map(|s| s.started_at).min();
    let latest = sessions.iter().filter_map(|s| s.ended_at).max();
    let total_span_hours = match (earliest, latest) {
        (Some(start), Some(end)) if end > start => (end - start).num_seconds() as f64 / 3600.0,
        _ => 0.0,
    };
    let idle_hours = (total_span_hours - (work_hours + commute_hours + lunch_hours)).max(0.0);

    ChartBucket {
        bucket_start: start,
        work_hours,
        commute_hours,
        lunch_hours,
        total_span_hours,
        idle_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn session(state: ActivityState, start: (i32, u32, u32, u32), end: (i32, u32, u32, u32)) -> TrackingSession {
        let started_at = Utc.with_ymd_and_hms(start.0, start.1, start.2, start.3, 0, 0).unwrap();
        let ended_at = Utc.with_ymd_and_hms(end.0, end.1, end.2, end.3, 0, 0).unwrap();
        TrackingSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            state,
            started_at,
            ended_at: Some(ended_at),
            commute_direction: None,
            note: None,
        }
    }

    #[test]
    fn empty_buckets_are_present_not_elided() {
        let user = User::new(1, 0, false);
        let from = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let buckets = chart_data(&user, &[], from, to, ChartGranularity::Day);
        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(|b| b.total_span_hours == 0.0));
    }

    #[test]
    fn day_bucket_sums_and_spans() {
        let user = User::new(1, 0, false);
        let sessions = vec![
            session(ActivityState::Working, (2026, 1, 5, 9), (2026, 1, 5, 12)),
            session(ActivityState::Lunch, (2026, 1, 5, 12), (2026, 1, 5, 13)),
            session(ActivityState::Working, (2026, 1, 5, 13), (2026, 1, 5, 17)),
        ];
        let from = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let buckets = chart_data(&user, &sessions, from, from, ChartGranularity::Day);
        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[0];
        assert!((bucket.work_hours - 7.0).abs() < 1e-9);
        assert!((bucket.lunch_hours - 1.0).abs() < 1e-9);
        assert!((bucket.total_span_hours - 8.0).abs() < 1e-9);
        assert!(bucket.idle_hours < 1e-9);
    }

    #[test]
    fn monthly_buckets_group_across_days() {
        let user = User::new(1, 0, false);
        let sessions = vec![
            session(ActivityState::Working, (2026, 1, 5, 9), (2026, 1, 5, 17)),
            session(ActivityState::Working, (2026, 1, 20, 9), (2026, 1, 20, 17)),
        ];
        let from = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let buckets = chart_data(&user, &sessions, from, to, ChartGranularity::Month);
        assert_eq!(buckets.len(), 1);
        assert!((buckets[0].work_hours - 16.0).abs() < 1e-9);
    }
}
