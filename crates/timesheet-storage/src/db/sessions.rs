use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use timesheet_domain::{ActivityState, CommuteDirection, CoreError, CoreResult, TrackingSession};
use uuid::Uuid;

use super::helpers::{parse_datetime, parse_uuid};
use super::Database;

fn internal(err: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(err.to_string())
}

impl Database {
    /// The user's single active session, if any. O(1) via the partial
    /// index on `(user_id) WHERE ended_at IS NULL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn active_session(&self, user_id: Uuid) -> anyhow::Result<Option<TrackingSession>> {
        self.conn
            .query_row(
                "SELECT id, user_id, state, started_at, ended_at, commute_direction, note
                 FROM tracking_sessions WHERE user_id = ?1 AND ended_at IS NULL",
                params![user_id.to_string()],
                Self::row_to_session,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Fetch a session by id regardless of owner; callers must perform the
    /// owner check themselves (§4.2).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_session_by_id(&self, id: Uuid) -> anyhow::Result<Option<TrackingSession>> {
        self.conn
            .query_row(
                "SELECT id, user_id, state, started_at, ended_at, commute_direction, note
                 FROM tracking_sessions WHERE id = ?1",
                params![id.to_string()],
                Self::row_to_session,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Sessions whose `started_at` falls in `[from, to)`, ascending.
    /// Sessions that spill partially outside the window are excluded;
    /// callers needing spill must widen the window themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn range(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TrackingSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, state, started_at, ended_at, commute_direction, note
             FROM tracking_sessions
             WHERE user_id = ?1 AND started_at >= ?2 AND started_at < ?3
             ORDER BY started_at ASC",
        )?;
        let sessions = stmt
            .query_map(
                params![user_id.to_string(), from.to_rfc3339(), to.to_rfc3339()],
                Self::row_to_session,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Most recent sessions first, optionally restricted to a single local
    /// date (`day_local_filter`, already resolved to a UTC instant range by
    /// the caller since only the caller knows the user's offset).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent(
        &self,
        user_id: Uuid,
        limit: u32,
        day_local_filter: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> anyhow::Result<Vec<TrackingSession>> {
        let sessions = if let Some((day_start, day_end)) = day_local_filter {
            let mut stmt = self.conn.prepare(
                "SELECT id, user_id, state, started_at, ended_at, commute_direction, note
                 FROM tracking_sessions
                 WHERE user_id = ?1 AND started_at >= ?2 AND started_at < ?3
                 ORDER BY started_at DESC LIMIT ?4",
            )?;
            let rows = stmt
                .query_map(
                    params![
                        user_id.to_string(),
                        day_start.to_rfc3339(),
                        day_end.to_rfc3339(),
                        limit,
                    ],
                    Self::row_to_session,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        } else {
            let mut stmt = self.conn.prepare(
                "SELECT id, user_id, state, started_at, ended_at, commute_direction, note
                 FROM tracking_sessions
                 WHERE user_id = ?1
                 ORDER BY started_at DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![user_id.to_string(), limit], Self::row_to_session)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        Ok(sessions)
    }

    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_session(&self, session: &TrackingSession) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO tracking_sessions
             (id, user_id, state, started_at, ended_at, commute_direction, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                session.state.as_str(),
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
                session.commute_direction.map(CommuteDirection::as_str),
                session.note,
            ],
        )?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_session(&self, session: &TrackingSession) -> anyhow::Result<()> {
        self.conn.execute(
            "UPDATE tracking_sessions SET
                state = ?2, started_at = ?3, ended_at = ?4, commute_direction = ?5, note = ?6
             WHERE id = ?1",
            params![
                session.id.to_string(),
                session.state.as_str(),
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
                session.commute_direction.map(CommuteDirection::as_str),
                session.note,
            ],
        )?;
        Ok(())
    }

    /// Close a session at `ended_at` and open a fresh active session for
    /// the same user in one commit — the "close then open" pair §4.1
    /// requires to be atomic. `closing` is `None` when there was no prior
    /// active session.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails; on error nothing is
    /// committed.
    pub fn close_and_open(
        &self,
        closing: Option<(Uuid, DateTime<Utc>)>,
        new_session: &TrackingSession,
    ) -> anyhow::Result<()> {
        self.with_transaction(|| {
            if let Some((closing_id, ended_at)) = closing {
                self.conn.execute(
                    "UPDATE tracking_sessions SET ended_at = ?2 WHERE id = ?1",
                    params![closing_id.to_string(), ended_at.to_rfc3339()],
                )?;
            }
            self.insert_session(new_session)?;
            Ok(())
        })
    }

    /// Close the user's active session at `ended_at` without opening a new
    /// one (the `EndActive` toggle outcome).
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn close_session(&self, session_id: Uuid, ended_at: DateTime<Utc>) -> anyhow::Result<()> {
        self.conn.execute(
            "UPDATE tracking_sessions SET ended_at = ?2 WHERE id = ?1",
            params![session_id.to_string(), ended_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Delete a closed session owned by `owner_id`. Active sessions must be
    /// ended first (§4.2 "Deletion").
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the session does not exist or is
    /// not owned by `owner_id`, `CoreError::Conflict` if it is still
    /// active, or `CoreError::Internal` on a database failure.
    pub fn remove_session(&self, session_id: Uuid, owner_id: Uuid) -> CoreResult<()> {
        let session = self
            .get_session_by_id(session_id)
            .map_err(internal)?
            .ok_or(CoreError::NotFound)?;
        if session.user_id != owner_id {
            return Err(CoreError::NotAuthorized);
        }
        if session.is_active() {
            return Err(CoreError::conflict("cannot delete an active session"));
        }
        self.conn
            .execute(
                "DELETE FROM tracking_sessions WHERE id = ?1",
                params![session_id.to_string()],
            )
            .map_err(internal)?;
        Ok(())
    }

    /// Shift a session's start time by `delta_minutes` (signed). Applies to
    /// closed or active sessions. Rejects a result where `started_at >=
    /// ended_at`, or where the new start overlaps the previous same-user
    /// session's end.
    ///
    /// # Errors
    ///
    /// `CoreError::NotFound` / `NotAuthorized` on ownership mismatch,
    /// `CoreError::Conflict` on an invariant violation, `Internal` on a
    /// database failure.
    pub fn adjust_start_time(
        &self,
        session_id: Uuid,
        owner_id: Uuid,
        delta_minutes: i64,
    ) -> CoreResult<TrackingSession> {
        let mut session = self
            .get_session_by_id(session_id)
            .map_err(internal)?
            .ok_or(CoreError::NotFound)?;
        if session.user_id != owner_id {
            return Err(CoreError::NotAuthorized);
        }

        let new_start = session.started_at + Duration::minutes(delta_minutes);

        if let Some(ended_at) = session.ended_at {
            if new_start >= ended_at {
                return Err(CoreError::conflict(
                    "new start must be before the session's end",
                ));
            }
        }

        if let Some(previous_end) = self
            .previous_session_end(owner_id, session.started_at)
            .map_err(internal)?
        {
            if new_start < previous_end {
                return Err(CoreError::conflict(
                    "new start overlaps the previous session",
                ));
            }
        }

        session.started_at = new_start;
        self.update_session(&session).map_err(internal)?;
        Ok(session)
    }

    /// Shift a session's end time by `delta_minutes`. Fails on an active
    /// session (§4.2: "Fails if the session is active"). Rejects a result
    /// where `ended_at <= started_at`, or where the new end overlaps the
    /// next same-user session's start.
    ///
    /// # Errors
    ///
    /// `CoreError::NotFound` / `NotAuthorized` on ownership mismatch,
    /// `CoreError::Conflict` if active or an invariant is violated,
    /// `Internal` on a database failure.
    pub fn adjust_end_time(
        &self,
        session_id: Uuid,
        owner_id: Uuid,
        delta_minutes: i64,
    ) -> CoreResult<TrackingSession> {
        let mut session = self
            .get_session_by_id(session_id)
            .map_err(internal)?
            .ok_or(CoreError::NotFound)?;
        if session.user_id != owner_id {
            return Err(CoreError::NotAuthorized);
        }
        let Some(current_end) = session.ended_at else {
            return Err(CoreError::conflict("cannot adjust end of active session"));
        };

        let new_end = current_end + Duration::minutes(delta_minutes);
        if new_end <= session.started_at {
            return Err(CoreError::conflict(
                "new end must be after the session's start",
            ));
        }

        if let Some(next_start) = self
            .next_session_start(owner_id, session.started_at)
            .map_err(internal)?
        {
            if new_end > next_start {
                return Err(CoreError::conflict("new end overlaps the next session"));
            }
        }

        session.ended_at = Some(new_end);
        self.update_session(&session).map_err(internal)?;
        Ok(session)
    }

    fn previous_session_end(
        &self,
        user_id: Uuid,
        before_started_at: DateTime<Utc>,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        self.conn
            .query_row(
                "SELECT ended_at FROM tracking_sessions
                 WHERE user_id = ?1 AND started_at < ?2 AND ended_at IS NOT NULL
                 ORDER BY started_at DESC LIMIT 1",
                params![user_id.to_string(), before_started_at.to_rfc3339()],
                |row| {
                    let raw: String = row.get(0)?;
                    parse_datetime(&raw)
                },
            )
            .optional()
            .map_err(Into::into)
    }

    fn next_session_start(
        &self,
        user_id: Uuid,
        after_started_at: DateTime<Utc>,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        self.conn
            .query_row(
                "SELECT started_at FROM tracking_sessions
                 WHERE user_id = ?1 AND started_at > ?2
                 ORDER BY started_at ASC LIMIT 1",
                params![user_id.to_string(), after_started_at.to_rfc3339()],
                |row| {
                    let raw: String = row.get(0)?;
                    parse_datetime(&raw)
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Whether `candidate_start` would fall inside any previously closed
    /// session for `user_id` — used to reject an offset-backfilled toggle
    /// per §4.1 ("must not produce a session whose start is earlier than
    /// the previously closed session's end").
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn overlaps_closed_session(
        &self,
        user_id: Uuid,
        candidate_start: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tracking_sessions
             WHERE user_id = ?1 AND ended_at IS NOT NULL
               AND started_at <= ?2 AND ended_at > ?2",
            params![user_id.to_string(), candidate_start.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Every session for `user_id` whose local start date equals `date`,
    /// used by the commute-direction inferrer. `local_start`/`local_end`
    /// bracket the local day already converted to UTC by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn sessions_on_local_date(
        &self,
        user_id: Uuid,
        local_start: DateTime<Utc>,
        local_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TrackingSession>> {
        self.range(user_id, local_start, local_end)
    }

    /// All active sessions across every user — used by the auto-shutdown
    /// worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all_active_sessions(&self) -> anyhow::Result<Vec<TrackingSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, state, started_at, ended_at, commute_direction, note
             FROM tracking_sessions WHERE ended_at IS NULL",
        )?;
        let sessions = stmt
            .query_map([], Self::row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Closed sessions of `state` for `user_id` started within the last
    /// `days` days, most recent first — feeds the auto-shutdown worker's
    /// historical-average computation.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_closed_sessions_by_state(
        &self,
        user_id: Uuid,
        state: ActivityState,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TrackingSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, state, started_at, ended_at, commute_direction, note
             FROM tracking_sessions
             WHERE user_id = ?1 AND state = ?2 AND ended_at IS NOT NULL AND started_at >= ?3
             ORDER BY started_at DESC",
        )?;
        let sessions = stmt
            .query_map(
                params![user_id.to_string(), state.as_str(), since.to_rfc3339()],
                Self::row_to_session,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Every session whose `started_at` local date (per `utc_offset_minutes`)
    /// equals `date`, for every user — used by the compliance evaluator and
    /// daily breakdown to avoid one query per user per day.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn local_date_bounds(
        date: NaiveDate,
        utc_offset_minutes: i32,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let local_midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        let start = DateTime::<Utc>::from_naive_utc_and_offset(local_midnight, Utc)
            - Duration::minutes(i64::from(utc_offset_minutes));
        let end = start + Duration::days(1);
        (start, end)
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<TrackingSession> {
        let state_raw: String = row.get(2)?;
        let state = ActivityState::from_str(&state_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown activity state: {state_raw}").into(),
            )
        })?;

        let ended_at_raw: Option<String> = row.get(4)?;
        let ended_at = ended_at_raw.map(|s| parse_datetime(&s)).transpose()?;

        let direction_raw: Option<String> = row.get(5)?;
        let commute_direction = direction_raw
            .map(|s| {
                CommuteDirection::from_str(&s).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        format!("unknown commute direction: {s}").into(),
                    )
                })
            })
            .transpose()?;

        Ok(TrackingSession {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            user_id: parse_uuid(&row.get::<_, String>(1)?)?,
            state,
            started_at: parse_datetime(&row.get::<_, String>(3)?)?,
            ended_at,
            commute_direction,
            note: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use timesheet_domain::User;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = User::new(1, 0, false);
        db.create_user(&user).unwrap();
        (db, user.id)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn active_session_round_trips() {
        let (db, user_id) = setup();
        let session = TrackingSession::new_active(
            user_id,
            ActivityState::Working,
            at(2026, 1, 5, 9, 0),
            None,
        );
        db.insert_session(&session).unwrap();

        let active = db.active_session(user_id).unwrap().unwrap();
        assert_eq!(active.id, session.id);
        assert!(active.is_active());
    }

    #[test]
    fn close_and_open_is_atomic() {
        let (db, user_id) = setup();
        let first = TrackingSession::new_active(
            user_id,
            ActivityState::Commuting,
            at(2026, 1, 5, 8, 0),
            Some(CommuteDirection::ToWork),
        );
        db.insert_session(&first).unwrap();

        let second = TrackingSession::new_active(
            user_id,
            ActivityState::Working,
            at(2026, 1, 5, 8, 30),
            None,
        );
        db.close_and_open(Some((first.id, at(2026, 1, 5, 8, 30))), &second)
            .unwrap();

        let closed = db.get_session_by_id(first.id).unwrap().unwrap();
        assert_eq!(closed.ended_at, Some(at(2026, 1, 5, 8, 30)));
        let active = db.active_session(user_id).unwrap().unwrap();
        assert_eq!(active.id, second.id);
    }

    /// S4: adjusting the end of an active session is forbidden, but
    /// adjusting its start succeeds.
    #[test]
    fn s4_adjust_active_forbidden() {
        let (db, user_id) = setup();
        let session = TrackingSession::new_active(
            user_id,
            ActivityState::Commuting,
            at(2026, 1, 5, 17, 10),
            Some(CommuteDirection::ToHome),
        );
        db.insert_session(&session).unwrap();

        let end_result = db.adjust_end_time(session.id, user_id, 5);
        assert!(matches!(end_result, Err(CoreError::Conflict(_))));

        let adjusted = db.adjust_start_time(session.id, user_id, -5).unwrap();
        assert_eq!(adjusted.started_at, at(2026, 1, 5, 17, 5));
    }

    #[test]
    fn adjust_start_rejects_overlap_with_previous_session() {
        let (db, user_id) = setup();
        let previous = TrackingSession {
            ended_at: Some(at(2026, 1, 5, 9, 0)),
            ..TrackingSession::new_active(
                user_id,
                ActivityState::Commuting,
                at(2026, 1, 5, 8, 0),
                Some(CommuteDirection::ToWork),
            )
        };
        db.insert_session(&previous).unwrap();

        let current = TrackingSession {
            ended_at: Some(at(2026, 1, 5, 17, 0)),
            ..TrackingSession::new_active(
                user_id,
                ActivityState::Working,
                at(2026, 1, 5, 9, 30),
                None,
            )
        };
        db.insert_session(&current).unwrap();

        let result = db.adjust_start_time(current.id, user_id, -45);
        assert!(matches!(result, Err(CoreError::Conflict(_))));
    }

    #[test]
    fn adjust_end_rejects_overlap_with_next_session() {
        let (db, user_id) = setup();
        let current = TrackingSession {
            ended_at: Some(at(2026, 1, 5, 12, 0)),
            ..TrackingSession::new_active(
                user_id,
                ActivityState::Working,
                at(2026, 1, 5, 9, 0),
                None,
            )
        };
        db.insert_session(&current).unwrap();

        let next = TrackingSession {
            ended_at: Some(at(2026, 1, 5, 12, 45)),
            ..TrackingSession::new_active(
                user_id,
                ActivityState::Lunch,
                at(2026, 1, 5, 12, 15),
                None,
            )
        };
        db.insert_session(&next).unwrap();

        let result = db.adjust_end_time(current.id, user_id, 30);
        assert!(matches!(result, Err(CoreError::Conflict(_))));
    }

    #[test]
    fn remove_session_rejects_active_session() {
        let (db, user_id) = setup();
        let session = TrackingSession::new_active(
            user_id,
            ActivityState::Working,
            at(2026, 1, 5, 9, 0),
            None,
        );
        db.insert_session(&session).unwrap();

        let result = db.remove_session(session.id, user_id);
        assert!(matches!(result, Err(CoreError::Conflict(_))));
    }

    #[test]
    fn remove_session_rejects_non_owner() {
        let (db, user_id) = setup();
        let other = User::new(2, 0, false);
        db.create_user(&other).unwrap();

        let session = TrackingSession {
            ended_at: Some(at(2026, 1, 5, 10, 0)),
            ..TrackingSession::new_active(
                user_id,
                ActivityState::Working,
                at(2026, 1, 5, 9, 0),
                None,
            )
        };
        db.insert_session(&session).unwrap();

        let result = db.remove_session(session.id, other.id);
        assert!(matches!(result, Err(CoreError::NotAuthorized)));
    }

    #[test]
    fn overlaps_closed_session_detects_containment() {
        let (db, user_id) = setup();
        let session = TrackingSession {
            ended_at: Some(at(2026, 1, 5, 12, 0)),
            ..TrackingSession::new_active(
                user_id,
                ActivityState::Working,
                at(2026, 1, 5, 9, 0),
                None,
            )
        };
        db.insert_session(&session).unwrap();

        assert!(db
            .overlaps_closed_session(user_id, at(2026, 1, 5, 10, 0))
            .unwrap());
        assert!(!db
            .overlaps_closed_session(user_id, at(2026, 1, 5, 13, 0))
            .unwrap());
    }

    #[test]
    fn all_active_sessions_spans_every_user() {
        let (db, user_id) = setup();
        let other = User::new(2, 0, false);
        db.create_user(&other).unwrap();

        db.insert_session(&TrackingSession::new_active(
            user_id,
            ActivityState::Working,
            at(2026, 1, 5, 9, 0),
            None,
        ))
        .unwrap();
        db.insert_session(&TrackingSession::new_active(
            other.id,
            ActivityState::Working,
            at(2026, 1, 5, 9, 0),
            None,
        ))
        .unwrap();

        assert_eq!(db.all_active_sessions().unwrap().len(), 2);
    }
}
