use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One imported attendance record, unique per (user, date). Treated as
/// immutable by the core; refreshed by replacing the user's range in one
/// transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployerAttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub working_hours: Option<f64>,
    pub has_conflict: bool,
    pub conflict_description: Option<String>,
}

impl EmployerAttendanceRecord {
    #[must_use]
    pub fn new(user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            clock_in: None,
            clock_out: None,
            working_hours: None,
            has_conflict: false,
            conflict_description: None,
        }
    }
}
