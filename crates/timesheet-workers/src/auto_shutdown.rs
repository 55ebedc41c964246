use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use timesheet_domain::{ActivityState, TrackingSession, User};
use timesheet_storage::Database;
use tokio::time::interval;

use crate::notifier::Notifier;

/// Historical window and minimum sample size for the threshold-percent rule
/// (§4.4.1, §9 open question — pinned per the spec's own resolution).
const HISTORY_WINDOW_DAYS: i64 = 30;
const MIN_HISTORICAL_SAMPLES: usize = 5;

fn cap_for_state(user: &User, state: ActivityState) -> Option<f64> {
    match state {
        ActivityState::Working => user.max_work_hours,
        ActivityState::Commuting => user.max_commute_hours,
        ActivityState::Lunch => user.max_lunch_hours,
    }
}

/// Pure computation of the shutdown point (§4.4.1 step 3). `historical`
/// carries the average historical duration and whether the minimum sample
/// size was met; the caller is responsible for gathering it from the store.
#[must_use]
pub fn compute_shutdown_point(
    started_at: DateTime<Utc>,
    cap_hours: Option<f64>,
    threshold_percent: Option<f64>,
    historical_average_hours: Option<f64>,
    historical_sample_count: usize,
) -> Option<DateTime<Utc>> {
    if let Some(cap) = cap_hours {
        return Some(started_at + hours(cap));
    }
    if let (Some(pct), Some(avg)) = (threshold_percent, historical_average_hours) {
        if historical_sample_count >= MIN_HISTORICAL_SAMPLES {
            return Some(started_at + hours(pct / 100.0 * avg));
        }
    }
    None
}

fn hours(h: f64) -> Duration {
    Duration::milliseconds((h * 3_600_000.0) as i64)
}

/// Run the auto-shutdown worker loop until `shutdown` reports `true`.
/// Period: five minutes (§4.4.1). `tokio::time::interval`'s default catch-up
/// behavior schedules each tick from the start of the previous one, so
/// processing latency never drifts the period (§4.4).
pub async fn run(db: Arc<Database>, notifier: Arc<dyn Notifier>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut ticker = interval(StdDuration::from_secs(5 * 60));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = tick(&db, notifier.as_ref(), Utc::now()).await {
                    log::error!("auto-shutdown tick failed: {e}");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("auto-shutdown worker shutting down");
                    break;
                }
            }
        }
    }
}

async fn tick(db: &Database, notifier: &dyn Notifier, now: DateTime<Utc>) -> anyhow::Result<()> {
    for session in db.all_active_sessions()? {
        if let Err(e) = handle_session(db, notifier, &session, now).await {
            log::warn!("auto-shutdown failed for session {}: {e}", session.id);
        }
    }
    Ok(())
}

async fn handle_session(
    db: &Database,
    notifier: &dyn Notifier,
    session: &TrackingSession,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let Some(user) = db.get_user_by_id(session.user_id)? else {
        return Ok(());
    };

    let cap_hours = cap_for_state(&user, session.state);
    let (historical_average_hours, historical_sample_count) = if cap_hours.is_none() {
        let since = now - Duration::days(HISTORY_WINDOW_DAYS);
        let history = db.recent_closed_sessions_by_state(user.id, session.state, since)?;
        let durations: Vec<f64> = history.iter().filter_map(TrackingSession::duration_hours).collect();
        let avg = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<f64>() / durations.len() as f64)
        };
        (avg, durations.len())
    } else {
        (None, 0)
    };

    let Some(shutdown_point) = compute_shutdown_point(
        session.started_at,
        cap_hours,
        user.forgot_shutdown_threshold_percent,
        historical_average_hours,
        historical_sample_count,
    ) else {
        return Ok(());
    };

    if now < shutdown_point {
        return Ok(());
    }

    db.with_transaction(|| db.close_session(session.id, shutdown_point))?;

    if let Err(e) = notifier
        .notify(
            user.id,
            &format!("your {} session was auto-closed after being left running", session.state.as_str()),
        )
        .await
    {
        log::warn!("auto-shutdown notification failed for user {}: {e}", user.id);
    }

    Ok(())
}
