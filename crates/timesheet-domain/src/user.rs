use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// A registered TimeSheet user. Created once on registration, mutated only
/// via settings commands, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    /// Integer id from the messaging platform (e.g. Telegram), unique.
    pub external_id: i64,
    pub is_admin: bool,
    /// Minutes to add to UTC to get the user's local time. Range -720..=840.
    pub utc_offset_minutes: i32,
    pub max_work_hours: Option<f64>,
    pub max_commute_hours: Option<f64>,
    pub max_lunch_hours: Option<f64>,
    pub lunch_reminder_hour: Option<u32>,
    pub lunch_reminder_minute: Option<u32>,
    pub target_work_hours: Option<f64>,
    pub target_office_hours: Option<f64>,
    /// Percent (> 100) of the historical average duration at which a
    /// forgotten session is auto-closed.
    pub forgot_shutdown_threshold_percent: Option<f64>,
}

impl User {
    #[must_use]
    pub fn new(external_id: i64, utc_offset_minutes: i32, is_admin: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id,
            is_admin,
            utc_offset_minutes,
            max_work_hours: None,
            max_commute_hours: None,
            max_lunch_hours: None,
            lunch_reminder_hour: None,
            lunch_reminder_minute: None,
            target_work_hours: None,
            target_office_hours: None,
            forgot_shutdown_threshold_percent: None,
        }
    }

    /// `started_at` + `utc_offset_minutes`, truncated to a calendar date.
    #[must_use]
    pub fn local_date(&self, instant: chrono::DateTime<chrono::Utc>) -> chrono::NaiveDate {
        (instant + chrono::Duration::minutes(i64::from(self.utc_offset_minutes))).date_naive()
    }

    /// `instant` converted to the user's local naive time.
    #[must_use]
    pub fn to_local(&self, instant: chrono::DateTime<chrono::Utc>) -> chrono::NaiveDateTime {
        (instant + chrono::Duration::minutes(i64::from(self.utc_offset_minutes))).naive_utc()
    }

    #[must_use]
    pub const fn is_offset_in_range(minutes: i32) -> bool {
        minutes >= -720 && minutes <= 840
    }

    /// Checks the §3 settings invariants on this user's current field
    /// values. Callers persist only after this succeeds; it performs no
    /// I/O itself.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidRequest` naming the first field that
    /// violates its invariant.
    pub fn validate(&self) -> CoreResult<()> {
        if !Self::is_offset_in_range(self.utc_offset_minutes) {
            return Err(CoreError::invalid_request(
                "utc_offset_minutes must be between -720 and 840",
            ));
        }
        for (name, hours) in [
            ("max_work_hours", self.max_work_hours),
            ("max_commute_hours", self.max_commute_hours),
            ("max_lunch_hours", self.max_lunch_hours),
        ] {
            if hours.is_some_and(|h| h <= 0.0) {
                return Err(CoreError::invalid_request(format!("{name} must be positive")));
            }
        }
        if self.lunch_reminder_hour.is_some_and(|h| h > 23) {
            return Err(CoreError::invalid_request(
                "lunch_reminder_hour must be between 0 and 23",
            ));
        }
        if self.lunch_reminder_minute.is_some_and(|m| m > 59) {
            return Err(CoreError::invalid_request(
                "lunch_reminder_minute must be between 0 and 59",
            ));
        }
        if self
            .forgot_shutdown_threshold_percent
            .is_some_and(|p| p <= 100.0)
        {
            return Err(CoreError::invalid_request(
                "forgot_shutdown_threshold_percent must exceed 100",
            ));
        }
        Ok(())
    }
}
