use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three persisted activity states. Idle is never persisted — the
/// absence of an active session *is* idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityState {
    Commuting,
    Working,
    Lunch,
}

impl ActivityState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commuting => "commuting",
            Self::Working => "working",
            Self::Lunch => "lunch",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "commuting" => Some(Self::Commuting),
            "working" => Some(Self::Working),
            "lunch" => Some(Self::Lunch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommuteDirection {
    ToWork,
    ToHome,
}

impl CommuteDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToWork => "to_work",
            Self::ToHome => "to_home",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "to_work" => Some(Self::ToWork),
            "to_home" => Some(Self::ToHome),
            _ => None,
        }
    }
}

/// A closed or open interval of one activity, owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: ActivityState,
    pub started_at: DateTime<Utc>,
    /// `None` iff this is the user's active session.
    pub ended_at: Option<DateTime<Utc>>,
    /// Present iff `state == Commuting`.
    pub commute_direction: Option<CommuteDirection>,
    pub note: Option<String>,
}

impl TrackingSession {
    #[must_use]
    pub fn new_active(
        user_id: Uuid,
        state: ActivityState,
        started_at: DateTime<Utc>,
        commute_direction: Option<CommuteDirection>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            state,
            started_at,
            ended_at: None,
            commute_direction,
            note: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Duration in hours for a closed session; `None` if still active.
    #[must_use]
    pub fn duration_hours(&self) -> Option<f64> {
        self.ended_at.map(|end| {
            (end - self.started_at).num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0)
        })
    }

    /// True when the session's invariants (direction presence, ordering)
    /// hold in isolation; does not check cross-session invariants.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let direction_matches_state = match self.state {
            ActivityState::Commuting => self.commute_direction.is_some(),
            ActivityState::Working | ActivityState::Lunch => self.commute_direction.is_none(),
        };
        let ordering_ok = self.ended_at.map_or(true, |end| end > self.started_at);
        direction_matches_state && ordering_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn active_session_has_no_duration() {
        let session =
            TrackingSession::new_active(Uuid::new_v4(), ActivityState::Working, Utc::now(), None);
        assert!(session.is_active());
        assert!(session.duration_hours().is_none());
    }

    #[test]
    fn closed_session_reports_duration_in_hours() {
        let started_at = Utc::now();
        let mut session =
            TrackingSession::new_active(Uuid::new_v4(), ActivityState::Working, started_at, None);
        session.ended_at = Some(started_at + Duration::minutes(90));
        assert_eq!(session.duration_hours(), Some(1.5));
    }

    #[test]
    fn commuting_without_direction_is_not_well_formed() {
        let session =
            TrackingSession::new_active(Uuid::new_v4(), ActivityState::Commuting, Utc::now(), None);
        assert!(!session.is_well_formed());
    }

    #[test]
    fn working_with_direction_is_not_well_formed() {
        let session = TrackingSession::new_active(
            Uuid::new_v4(),
            ActivityState::Working,
            Utc::now(),
            Some(CommuteDirection::ToWork),
        );
        assert!(!session.is_well_formed());
    }

    #[test]
    fn ended_at_before_started_at_is_not_well_formed() {
        let started_at = Utc::now();
        let mut session =
            TrackingSession::new_active(Uuid::new_v4(), ActivityState::Lunch, started_at, None);
        session.ended_at = Some(started_at - Duration::minutes(5));
        assert!(!session.is_well_formed());
    }

    #[test]
    fn state_string_round_trips() {
        for state in [ActivityState::Commuting, ActivityState::Working, ActivityState::Lunch] {
            assert_eq!(ActivityState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(ActivityState::from_str("bogus"), None);
    }
}
