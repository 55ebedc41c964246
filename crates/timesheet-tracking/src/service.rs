use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use timesheet_domain::{CoreError, CoreResult, TrackingSession, User};
use timesheet_storage::Database;

use crate::decision::{decide, ToggleOutcome};
use crate::direction::infer_direction;
use crate::offset::{resolve, TimeSpec};

/// Default absolute bound (§4.1) on how far a resolved toggle timestamp may
/// sit from "now".
pub const DEFAULT_OFFSET_BOUND: Duration = Duration::hours(12);

/// Result of a successful toggle.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleResult {
    Started(TrackingSession),
    Ended(TrackingSession),
}

/// Orchestrates the pure state machine, commute direction inference, and
/// time-offset resolution against the Session Store. This is the Tracking
/// Service of §2's component diagram.
pub struct TrackingService {
    db: Arc<Database>,
    offset_bound: Duration,
}

impl TrackingService {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            offset_bound: DEFAULT_OFFSET_BOUND,
        }
    }

    #[must_use]
    pub fn with_offset_bound(mut self, bound: Duration) -> Self {
        self.offset_bound = bound;
        self
    }

    /// Apply a toggle for `user` requesting `action` as observed at `now`,
    /// optionally qualified by `time_spec`. Returns the session that was
    /// started or ended. `now` is supplied by the caller (rather than read
    /// internally) so the composition root takes one snapshot of the clock
    /// per request and so tests can drive fixed scenarios deterministically.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidRequest` on an out-of-bound offset,
    /// `CoreError::Conflict` ("would overlap") if the resolved start would
    /// fall inside a previously closed session or the active session would
    /// be closed/opened out of order, `CoreError::Internal` on a storage
    /// failure.
    pub fn toggle(
        &self,
        user: &User,
        action: timesheet_domain::ActivityState,
        time_spec: Option<TimeSpec>,
        now: DateTime<Utc>,
    ) -> CoreResult<ToggleResult> {
        let t = resolve(user, time_spec, now, self.offset_bound)?;

        let active = self
            .db
            .active_session(user.id)
            .map_err(|e| CoreError::Internal(e.to_string()))?;

        match decide(active.as_ref().map(|s| s.state), action) {
            ToggleOutcome::NoChange => Err(CoreError::invalid_request("no-op toggle")),
            ToggleOutcome::EndActive => {
                let active = active.expect("EndActive implies an active session exists");
                if t <= active.started_at {
                    return Err(CoreError::conflict(
                        "end time must be after the session's start",
                    ));
                }
                self.db
                    .close_session(active.id, t)
                    .map_err(|e| CoreError::Internal(e.to_string()))?;
                let mut closed = active;
                closed.ended_at = Some(t);
                Ok(ToggleResult::Ended(closed))
            }
            ToggleOutcome::StartNew { new_state } => {
                self.start_new(user, active, new_state, t)
                    .map(ToggleResult::Started)
            }
        }
    }

    fn start_new(
        &self,
        user: &User,
        active: Option<TrackingSession>,
        new_state: timesheet_domain::ActivityState,
        t: DateTime<Utc>,
    ) -> CoreResult<TrackingSession> {
        if let Some(active) = &active {
            if t <= active.started_at {
                return Err(CoreError::conflict(
                    "close time must be after the active session's start",
                ));
            }
        }

        let overlaps = self
            .db
            .overlaps_closed_session(user.id, t)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        if overlaps {
            return Err(CoreError::conflict(
                "resolved start overlaps a previously closed session",
            ));
        }

        let direction = if new_state == timesheet_domain::ActivityState::Commuting {
            Some(self.infer_commute_direction(user, t)?)
        } else {
            None
        };

        let new_session = TrackingSession::new_active(user.id, new_state, t, direction);

        if let Some(active) = active {
            self.db
                .close_and_open(Some((active.id, t)), &new_session)
                .map_err(|e| CoreError::Internal(e.to_string()))?;
        } else {
            self.db
                .insert_session(&new_session)
                .map_err(|e| CoreError::Internal(e.to_string()))?;
        }

        Ok(new_session)
    }

    fn infer_commute_direction(
        &self,
        user: &User,
        t: DateTime<Utc>,
    ) -> CoreResult<timesheet_domain::CommuteDirection> {
        let local_date = user.local_date(t);
        let (day_start, day_end) = Database::local_date_bounds(local_date, user.utc_offset_minutes);
        let sessions_today = self
            .db
            .sessions_on_local_date(user.id, day_start, day_end)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(infer_direction(&sessions_today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use timesheet_domain::ActivityState::{Commuting, Lunch, Working};
    use timesheet_domain::CommuteDirection;

    fn setup() -> (TrackingService, User) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = User::new(1, 120, false);
        db.create_user(&user).unwrap();
        (TrackingService::new(db), user)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    /// §8 S1: a full morning-to-evening sequence of toggles. Two consecutive
    /// `work` sends (12:45, 17:00) with no intervening state change collapse
    /// into a single close per the decision table (`same_state_ends_active`),
    /// so this sequence yields five closed sessions, not six — see
    /// `DESIGN.md` for why the test follows the decision table over the
    /// narrative's approximate hour totals.
    #[test]
    fn s1_morning_sequence() {
        let (svc, user) = setup();

        svc.toggle(&user, Commuting, None, at(2026, 1, 5, 6, 0)).unwrap();
        svc.toggle(&user, Working, None, at(2026, 1, 5, 6, 30)).unwrap();
        svc.toggle(&user, Lunch, None, at(2026, 1, 5, 12, 0)).unwrap();
        svc.toggle(&user, Working, None, at(2026, 1, 5, 12, 45)).unwrap();
        svc.toggle(&user, Working, None, at(2026, 1, 5, 17, 0)).unwrap();
        svc.toggle(&user, Commuting, None, at(2026, 1, 5, 17, 10)).unwrap();
        svc.toggle(&user, Commuting, None, at(2026, 1, 5, 17, 55)).unwrap();

        let all = svc
            .db
            .range(user.id, at(2026, 1, 5, 0, 0), at(2026, 1, 6, 0, 0))
            .unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|s| !s.is_active()));

        let work_hours: f64 = all
            .iter()
            .filter(|s| s.state == Working)
            .filter_map(TrackingSession::duration_hours)
            .sum();
        assert!((work_hours - 9.75).abs() < 0.01);

        let commutes: Vec<_> = all.iter().filter(|s| s.state == Commuting).collect();
        assert_eq!(commutes[0].commute_direction, Some(CommuteDirection::ToWork));
        assert_eq!(
            commutes.last().unwrap().commute_direction,
            Some(CommuteDirection::ToHome)
        );
    }

    /// §8 S2: minute-offset backfill while idle.
    #[test]
    fn s2_minute_offset_backfill() {
        let (svc, user) = setup();
        let now = at(2026, 1, 5, 9, 17);
        let result = svc
            .toggle(&user, Working, Some(TimeSpec::MinuteOffset(-17)), now)
            .unwrap();
        let ToggleResult::Started(session) = result else {
            panic!("expected a started session");
        };
        assert_eq!(session.started_at, at(2026, 1, 5, 9, 0));
    }

    /// §8 S3: absolute backfill rejected because it overlaps a closed
    /// session.
    #[test]
    fn s3_absolute_backfill_overlap_rejected() {
        let (svc, user) = setup();
        svc.toggle(&user, Commuting, None, at(2026, 1, 5, 6, 0)).unwrap();
        svc.toggle(&user, Working, None, at(2026, 1, 5, 6, 30)).unwrap();
        svc.toggle(&user, Lunch, None, at(2026, 1, 5, 12, 0)).unwrap();
        svc.toggle(&user, Working, None, at(2026, 1, 5, 12, 45)).unwrap();
        svc.toggle(&user, Working, None, at(2026, 1, 5, 17, 0)).unwrap();
        svc.toggle(&user, Commuting, None, at(2026, 1, 5, 17, 10)).unwrap();
        svc.toggle(&user, Commuting, None, at(2026, 1, 5, 17, 55)).unwrap();

        let before = svc.db.range(user.id, at(2026, 1, 5, 0, 0), at(2026, 1, 6, 0, 0)).unwrap();

        let time_spec = TimeSpec::AbsoluteLocal(chrono::NaiveTime::from_hms_opt(16, 0, 0).unwrap());
        let result = svc.toggle(&user, Working, Some(time_spec), at(2026, 1, 5, 18, 0));
        assert!(matches!(result, Err(CoreError::Conflict(_))));

        let after = svc.db.range(user.id, at(2026, 1, 5, 0, 0), at(2026, 1, 6, 0, 0)).unwrap();
        assert_eq!(before.len(), after.len(), "no new session created");
    }
}
