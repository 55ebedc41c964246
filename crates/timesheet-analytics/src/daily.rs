use std::collections::BTreeMap;

use chrono::NaiveDate;
use timesheet_domain::{ActivityState, CommuteDirection, TrackingSession, User};

/// Per-day activity totals (§4.3.1). `office_span_hours` and `idle_hours`
/// are `None` when the day is missing one of the commute anchors that
/// defines office span.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub work_hours: f64,
    pub commute_to_work_hours: f64,
    pub commute_to_home_hours: f64,
    pub lunch_hours: f64,
    pub office_span_hours: Option<f64>,
    pub idle_hours: Option<f64>,
    pub has_activity: bool,
}

impl DailyBreakdown {
    fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            work_hours: 0.0,
            commute_to_work_hours: 0.0,
            commute_to_home_hours: 0.0,
            lunch_hours: 0.0,
            office_span_hours: None,
            idle_hours: None,
            has_activity: false,
        }
    }
}

/// Build one [`DailyBreakdown`] per date in `[from, to]` inclusive.
///
/// Sessions are partitioned by the local date of their `started_at` (§4.3.1
/// sum rule) — a session that spans midnight local is attributed in full to
/// its start date, never split. Only closed sessions contribute to totals;
/// an open session present in `sessions` is ignored here.
#[must_use]
pub fn daily_breakdown(
    user: &User,
    sessions: &[TrackingSession],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DailyBreakdown> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&TrackingSession>> = BTreeMap::new();
    for session in sessions {
        let date = user.local_date(session.started_at);
        by_date.entry(date).or_default().push(session);
    }

    let mut out = Vec::new();
    let mut date = from;
    while date <= to {
        out.push(match by_date.get(&date) {
            Some(day_sessions) => breakdown_for_day(date, day_sessions),
            None => DailyBreakdown::zero(date),
        });
        date = date.succ_opt().expect("date does not overflow within a report window");
    }
    out
}

fn breakdown_for_day(date: NaiveDate, sessions: &[&TrackingSession]) -> DailyBreakdown {
    let closed: Vec<&&TrackingSession> = sessions.iter().filter(|s| s.ended_at.is_some()).collect();

    let sum_state = |state: ActivityState| -> f64 {
        closed
            .iter()
            .filter(|s| s.state == state)
            .filter_map(|s| s.duration_hours())
            .sum()
    };
    let sum_commute = |direction: CommuteDirection| -> f64 {
        closed
            .iter()
            .filter(|s| s.state == ActivityState::Commuting && s.commute_direction == Some(direction))
            .filter_map(|s| s.duration_hours())
            .sum()
    };

    let work_hours = sum_state(ActivityState::Working);
    let lunch_hours = sum_state(ActivityState::Lunch);
    let commute_to_work_hours = sum_commute(CommuteDirection::ToWork);
    let commute_to_home_hours = sum_commute(CommuteDirection::ToHome);

    let first_to_work_end = closed
        .iter()
        .filter(|s| s.state == ActivityState::Commuting && s.commute_direction == Some(CommuteDirection::ToWork))
        .filter_map(|s| s.ended_at)
        .min();
    let last_to_home_start = closed
        .iter()
        .filter(|s| s.state == ActivityState::Commuting && s.commute_direction == Some(CommuteDirection::ToHome))
        .map(|s| s.started_at)
        .max();

    let office_span_hours = match (first_to_work_end, last_to_home_start) {
        (Some(start), Some(end)) if end > start => Some((end - start).num_seconds() as f64 / 3600.0),
        (Some(_), Some(_)) => Some(0.0),
        _ => None,
    };
    let idle_hours = office_span_hours.map(|span| (span - work_hours - lunch_hours).max(0.0));

    DailyBreakdown {
        date,
        work_hours,
        commute_to_work_hours,
        commute_to_home_hours,
        lunch_hours,
        office_span_hours,
        idle_hours,
        has_activity: !sessions.is_empty(),
    }
}
