use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Timelike, Weekday};
use timesheet_domain::{ActivityState, CommuteDirection, TrackingSession, User};

/// Commute duration pattern for a single weekday (§4.3.3). Present for all
/// seven weekdays regardless of data so consumers can iterate Monday..Sunday
/// without special-casing gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayPattern {
    pub weekday: Weekday,
    pub avg_duration_hours: f64,
    /// Average duration of sessions whose local start falls in each hour.
    pub hourly_histogram: BTreeMap<u32, f64>,
    pub optimal_start_hour: Option<u32>,
    pub optimal_start_duration_hours: Option<f64>,
    pub session_count: u32,
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Group completed commute sessions matching `direction` by local weekday
/// and summarize each day's timing.
#[must_use]
pub fn commute_patterns_by_weekday(
    user: &User,
    sessions: &[TrackingSession],
    direction: CommuteDirection,
) -> Vec<WeekdayPattern> {
    let mut by_weekday: HashMap<Weekday, Vec<(u32, f64)>> = HashMap::new();
    for session in sessions {
        if session.state != ActivityState::Commuting || session.commute_direction != Some(direction) {
            continue;
        }
        let Some(duration) = session.duration_hours() else {
            continue;
        };
        let local_start = user.to_local(session.started_at);
        by_weekday
            .entry(local_start.weekday())
            .or_default()
            .push((local_start.hour(), duration));
    }

    WEEKDAYS
        .iter()
        .map(|&weekday| match by_weekday.get(&weekday) {
            Some(entries) => summarize_weekday(weekday, entries),
            None => WeekdayPattern {
                weekday,
                avg_duration_hours: 0.0,
                hourly_histogram: BTreeMap::new(),
                optimal_start_hour: None,
                optimal_start_duration_hours: None,
                session_count: 0,
            },
        })
        .collect()
}

fn summarize_weekday(weekday: Weekday, entries: &[(u32, f64)]) -> WeekdayPattern {
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for &(hour, duration) in entries {
        by_hour.entry(hour).or_default().push(duration);
    }

    let hourly_histogram: BTreeMap<u32, f64> = by_hour
        .iter()
        .map(|(&hour, durations)| (hour, durations.iter().sum::<f64>() / durations.len() as f64))
        .collect();

    let optimal = hourly_histogram
        .iter()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(&hour, &duration)| (hour, duration));

    let total: f64 = entries.iter().map(|(_, d)| d).sum();

    WeekdayPattern {
        weekday,
        avg_duration_hours: total / entries.len() as f64,
        hourly_histogram,
        optimal_start_hour: optimal.map(|(hour, _)| hour),
        optimal_start_duration_hours: optimal.map(|(_, duration)| duration),
        #[allow(clippy::cast_possible_truncation)]
        session_count: entries.len() as u32,
    }
}
