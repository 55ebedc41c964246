use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use timesheet_domain::{AnchorKind, ComplianceRule, RuleType, TrackingSession, User};

/// A single rule violation on a single day (§4.3.5).
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceViolation {
    pub date: NaiveDate,
    pub rule_type: RuleType,
    pub actual_hours: f64,
    pub threshold_hours: f64,
    pub description: String,
}

/// Result of evaluating a set of rules across a window.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceReport {
    pub violations: Vec<ComplianceViolation>,
    pub total_days: u32,
    pub violation_count: u32,
}

/// Evaluate `rules` across `[from, to]` inclusive against `sessions`.
///
/// `holiday_covers` is supplied by the caller (backed by the Holiday table)
/// rather than queried here, keeping this function pure and testable.
#[must_use]
pub fn evaluate_compliance(
    user: &User,
    sessions: &[TrackingSession],
    rules: &[ComplianceRule],
    holiday_covers: impl Fn(NaiveDate) -> bool,
    from: NaiveDate,
    to: NaiveDate,
) -> ComplianceReport {
    let enabled: Vec<&ComplianceRule> = rules.iter().filter(|r| r.is_enabled).collect();
    let mut violations = Vec::new();
    let mut total_days = 0u32;

    let mut date = from;
    while date <= to {
        if !holiday_covers(date) {
            let day_sessions: Vec<&TrackingSession> = sessions
                .iter()
                .filter(|s| s.ended_at.is_some() && user.local_date(s.started_at) == date)
                .collect();

            for rule in &enabled {
                let Some((anchor_in, anchor_out)) = anchors(user, rule, &day_sessions, date) else {
                    continue;
                };
                total_days += 1;
                let actual_hours = (anchor_out - anchor_in).num_seconds() as f64 / 3600.0;
                if actual_hours < rule.threshold_hours {
                    violations.push(ComplianceViolation {
                        date,
                        rule_type: rule.rule_type,
                        actual_hours,
                        threshold_hours: rule.threshold_hours,
                        description: format!(
                            "{} on {date}: {actual_hours:.2}h below the {:.2}h threshold",
                            rule_description(rule.rule_type),
                            rule.threshold_hours
                        ),
                    });
                }
            }
        }
        date = date.succ_opt().expect("date does not overflow within a report window");
    }

    #[allow(clippy::cast_possible_truncation)]
    let violation_count = violations.len() as u32;
    ComplianceReport {
        violations,
        total_days,
        violation_count,
    }
}

fn rule_description(rule_type: RuleType) -> &'static str {
    match rule_type {
        RuleType::MinimumWorkHours => "minimum work hours",
        RuleType::MinimumOfficeSpan => "minimum office span",
        RuleType::MaximumLunchHours => "maximum lunch hours",
    }
}

/// Resolve a rule's clock-in/clock-out anchors for a day, or `None` if the
/// day should be skipped (no relevant sessions and the anchor isn't fixed).
fn anchors(
    user: &User,
    rule: &ComplianceRule,
    day_sessions: &[&TrackingSession],
    date: NaiveDate,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let anchor_in = resolve_anchor(user, rule.clock_in_kind, rule.fixed_clock_in, day_sessions, date, true)?;
    let anchor_out = resolve_anchor(user, rule.clock_out_kind, rule.fixed_clock_out, day_sessions, date, false)?;
    Some((anchor_in, anchor_out))
}

fn resolve_anchor(
    user: &User,
    kind: AnchorKind,
    fixed: Option<NaiveTime>,
    day_sessions: &[&TrackingSession],
    date: NaiveDate,
    is_clock_in: bool,
) -> Option<DateTime<Utc>> {
    match kind {
        AnchorKind::FirstSessionStart => day_sessions.iter().map(|s| s.started_at).min(),
        AnchorKind::LastSessionEnd => day_sessions.iter().filter_map(|s| s.ended_at).max(),
        AnchorKind::FixedTime => {
            let time = fixed.unwrap_or_else(|| {
                if is_clock_in {
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
                } else {
                    NaiveTime::from_hms_opt(17, 0, 0).unwrap()
                }
            });
            let local_naive = date.and_time(time);
            Some(
                DateTime::<Utc>::from_naive_utc_and_offset(local_naive, Utc)
                    - chrono::Duration::minutes(i64::from(user.utc_offset_minutes)),
            )
        }
    }
}
