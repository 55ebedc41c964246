use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolidayType {
    Vacation,
    Sick,
    Public,
}

impl HolidayType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vacation => "vacation",
            Self::Sick => "sick",
            Self::Public => "public",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "vacation" => Some(Self::Vacation),
            "sick" => Some(Self::Sick),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

/// A half-open interval `[start_date, end_date)` excluded from compliance
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub holiday_type: HolidayType,
    pub description: Option<String>,
}

impl Holiday {
    #[must_use]
    pub fn new(user_id: Uuid, start_date: NaiveDate, end_date: NaiveDate, holiday_type: HolidayType) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            start_date,
            end_date,
            holiday_type,
            description: None,
        }
    }

    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date
    }
}
