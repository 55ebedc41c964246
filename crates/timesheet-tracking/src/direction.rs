use timesheet_domain::{ActivityState, CommuteDirection, TrackingSession};

/// Infer the direction of a new commute session given every session the
/// user already has on the same local date (§4.1). The first commute of a
/// local day is `ToWork`; any commute started after the user's first
/// `Working` session that day is `ToHome` — independently of which commute
/// immediately preceded that working session.
#[must_use]
pub fn infer_direction(sessions_today: &[TrackingSession]) -> CommuteDirection {
    let has_worked_today = sessions_today
        .iter()
        .any(|s| s.state == ActivityState::Working);

    if has_worked_today {
        CommuteDirection::ToHome
    } else {
        CommuteDirection::ToWork
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn session(state: ActivityState) -> TrackingSession {
        TrackingSession::new_active(Uuid::new_v4(), state, Utc::now(), None)
    }

    #[test]
    fn first_commute_of_day_is_to_work() {
        let sessions = vec![];
        assert_eq!(infer_direction(&sessions), CommuteDirection::ToWork);
    }

    #[test]
    fn commute_before_any_work_is_to_work() {
        let sessions = vec![session(ActivityState::Commuting)];
        assert_eq!(infer_direction(&sessions), CommuteDirection::ToWork);
    }

    #[test]
    fn commute_after_working_is_to_home() {
        let sessions = vec![session(ActivityState::Commuting), session(ActivityState::Working)];
        assert_eq!(infer_direction(&sessions), CommuteDirection::ToHome);
    }

    #[test]
    fn commute_after_lunch_following_work_is_still_to_home() {
        let sessions = vec![
            session(ActivityState::Commuting),
            session(ActivityState::Working),
            session(ActivityState::Lunch),
            session(ActivityState::Working),
        ];
        assert_eq!(infer_direction(&sessions), CommuteDirection::ToHome);
    }
}
