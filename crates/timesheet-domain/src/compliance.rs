use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    MinimumWorkHours,
    MinimumOfficeSpan,
    MaximumLunchHours,
}

impl RuleType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MinimumWorkHours => "minimum_work_hours",
            Self::MinimumOfficeSpan => "minimum_office_span",
            Self::MaximumLunchHours => "maximum_lunch_hours",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "minimum_work_hours" => Some(Self::MinimumWorkHours),
            "minimum_office_span" => Some(Self::MinimumOfficeSpan),
            "maximum_lunch_hours" => Some(Self::MaximumLunchHours),
            _ => None,
        }
    }
}

/// How a rule's clock-in/clock-out anchor is derived for a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorKind {
    FirstSessionStart,
    LastSessionEnd,
    FixedTime,
}

/// Per-user, per-rule-type compliance configuration. Unique on (user,
/// rule_type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rule_type: RuleType,
    pub is_enabled: bool,
    pub threshold_hours: f64,
    pub clock_in_kind: AnchorKind,
    pub clock_out_kind: AnchorKind,
    pub fixed_clock_in: Option<NaiveTime>,
    pub fixed_clock_out: Option<NaiveTime>,
}

impl ComplianceRule {
    #[must_use]
    pub fn new(user_id: Uuid, rule_type: RuleType, threshold_hours: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            rule_type,
            is_enabled: true,
            threshold_hours,
            clock_in_kind: AnchorKind::FirstSessionStart,
            clock_out_kind: AnchorKind::LastSessionEnd,
            fixed_clock_in: None,
            fixed_clock_out: None,
        }
    }
}
