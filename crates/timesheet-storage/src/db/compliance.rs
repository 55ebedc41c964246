use rusqlite::{params, OptionalExtension};
use timesheet_domain::{AnchorKind, ComplianceRule, RuleType};
use uuid::Uuid;

use super::helpers::{parse_time, parse_uuid};
use super::Database;

fn anchor_to_str(kind: AnchorKind) -> &'static str {
    match kind {
        AnchorKind::FirstSessionStart => "first_session_start",
        AnchorKind::LastSessionEnd => "last_session_end",
        AnchorKind::FixedTime => "fixed_time",
    }
}

fn anchor_from_str(s: &str) -> rusqlite::Result<AnchorKind> {
    match s {
        "first_session_start" => Ok(AnchorKind::FirstSessionStart),
        "last_session_end" => Ok(AnchorKind::LastSessionEnd),
        "fixed_time" => Ok(AnchorKind::FixedTime),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown anchor kind: {other}").into(),
        )),
    }
}

impl Database {
    /// Insert or replace the rule for (user, `rule_type`) — unique on that
    /// pair per §6.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn upsert_compliance_rule(&self, rule: &ComplianceRule) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO user_compliance_rules
             (id, user_id, rule_type, is_enabled, threshold_hours, clock_in_kind, clock_out_kind,
              fixed_clock_in, fixed_clock_out)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(user_id, rule_type) DO UPDATE SET
                is_enabled = excluded.is_enabled,
                threshold_hours = excluded.threshold_hours,
                clock_in_kind = excluded.clock_in_kind,
                clock_out_kind = excluded.clock_out_kind,
                fixed_clock_in = excluded.fixed_clock_in,
                fixed_clock_out = excluded.fixed_clock_out",
            params![
                rule.id.to_string(),
                rule.user_id.to_string(),
                rule.rule_type.as_str(),
                i32::from(rule.is_enabled),
                rule.threshold_hours,
                anchor_to_str(rule.clock_in_kind),
                anchor_to_str(rule.clock_out_kind),
                rule.fixed_clock_in.map(|t| t.format("%H:%M:%S").to_string()),
                rule.fixed_clock_out.map(|t| t.format("%H:%M:%S").to_string()),
            ],
        )?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn compliance_rules_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ComplianceRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, rule_type, is_enabled, threshold_hours, clock_in_kind,
                    clock_out_kind, fixed_clock_in, fixed_clock_out
             FROM user_compliance_rules WHERE user_id = ?1",
        )?;
        let rules = stmt
            .query_map(params![user_id.to_string()], Self::row_to_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_compliance_rule(
        &self,
        user_id: Uuid,
        rule_type: RuleType,
    ) -> anyhow::Result<Option<ComplianceRule>> {
        self.conn
            .query_row(
                "SELECT id, user_id, rule_type, is_enabled, threshold_hours, clock_in_kind,
                        clock_out_kind, fixed_clock_in, fixed_clock_out
                 FROM user_compliance_rules WHERE user_id = ?1 AND rule_type = ?2",
                params![user_id.to_string(), rule_type.as_str()],
                Self::row_to_rule,
            )
            .optional()
            .map_err(Into::into)
    }

    fn row_to_rule(row: &rusqlite::Row) -> rusqlite::Result<ComplianceRule> {
        let rule_type_raw: String = row.get(2)?;
        let rule_type = RuleType::from_str(&rule_type_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown rule type: {rule_type_raw}").into(),
            )
        })?;

        let fixed_in_raw: Option<String> = row.get(7)?;
        let fixed_out_raw: Option<String> = row.get(8)?;

        Ok(ComplianceRule {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            user_id: parse_uuid(&row.get::<_, String>(1)?)?,
            rule_type,
            is_enabled: row.get::<_, i32>(3)? != 0,
            threshold_hours: row.get(4)?,
            clock_in_kind: anchor_from_str(&row.get::<_, String>(5)?)?,
            clock_out_kind: anchor_from_str(&row.get::<_, String>(6)?)?,
            fixed_clock_in: fixed_in_raw.map(|s| parse_time(&s)).transpose()?,
            fixed_clock_out: fixed_out_raw.map(|s| parse_time(&s)).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timesheet_domain::User;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = User::new(1, 0, false);
        db.create_user(&user).unwrap();
        (db, user.id)
    }

    #[test]
    fn upsert_is_unique_per_user_and_rule_type() {
        let (db, user_id) = setup();
        let rule = ComplianceRule::new(user_id, RuleType::MinimumWorkHours, 6.0);
        db.upsert_compliance_rule(&rule).unwrap();

        let mut updated = rule.clone();
        updated.threshold_hours = 7.5;
        updated.is_enabled = false;
        db.upsert_compliance_rule(&updated).unwrap();

        let rules = db.compliance_rules_for_user(user_id).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].threshold_hours, 7.5);
        assert!(!rules[0].is_enabled);
    }

    #[test]
    fn get_compliance_rule_returns_none_when_absent() {
        let (db, user_id) = setup();
        let rule = db
            .get_compliance_rule(user_id, RuleType::MaximumLunchHours)
            .unwrap();
        assert!(rule.is_none());
    }

    #[test]
    fn fixed_anchor_times_round_trip() {
        let (db, user_id) = setup();
        let mut rule = ComplianceRule::new(user_id, RuleType::MinimumOfficeSpan, 8.0);
        rule.clock_in_kind = AnchorKind::FixedTime;
        rule.fixed_clock_in = Some(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        db.upsert_compliance_rule(&rule).unwrap();

        let reloaded = db
            .get_compliance_rule(user_id, RuleType::MinimumOfficeSpan)
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.clock_in_kind, AnchorKind::FixedTime);
        assert_eq!(
            reloaded.fixed_clock_in,
            Some(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap())
        );
    }
}
