use chrono::NaiveDate;
use rusqlite::params;
use timesheet_domain::{Holiday, HolidayType};
use uuid::Uuid;

use super::helpers::{parse_date, parse_uuid};
use super::Database;

impl Database {
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_holiday(&self, holiday: &Holiday) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO holidays (id, user_id, start_date, end_date, holiday_type, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                holiday.id.to_string(),
                holiday.user_id.to_string(),
                holiday.start_date.to_string(),
                holiday.end_date.to_string(),
                holiday.holiday_type.as_str(),
                holiday.description,
            ],
        )?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn holidays_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Holiday>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, start_date, end_date, holiday_type, description
             FROM holidays WHERE user_id = ?1 ORDER BY start_date ASC",
        )?;
        let holidays = stmt
            .query_map(params![user_id.to_string()], Self::row_to_holiday)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(holidays)
    }

    /// Whether any holiday owned by `user_id` covers `date` — used to skip
    /// a day in compliance evaluation (§4.3.5).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn holiday_covers(&self, user_id: Uuid, date: NaiveDate) -> anyhow::Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM holidays
             WHERE user_id = ?1 AND start_date <= ?2 AND end_date > ?2",
            params![user_id.to_string(), date.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn row_to_holiday(row: &rusqlite::Row) -> rusqlite::Result<Holiday> {
        let type_raw: String = row.get(4)?;
        let holiday_type = HolidayType::from_str(&type_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown holiday type: {type_raw}").into(),
            )
        })?;

        Ok(Holiday {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            user_id: parse_uuid(&row.get::<_, String>(1)?)?,
            start_date: parse_date(&row.get::<_, String>(2)?)?,
            end_date: parse_date(&row.get::<_, String>(3)?)?,
            holiday_type,
            description: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use timesheet_domain::User;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = User::new(1, 0, false);
        db.create_user(&user).unwrap();
        (db, user.id)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn holiday_covers_is_half_open() {
        let (db, user_id) = setup();
        let holiday = Holiday {
            id: Uuid::new_v4(),
            user_id,
            start_date: date(2026, 3, 10),
            end_date: date(2026, 3, 13),
            holiday_type: HolidayType::Vacation,
            description: None,
        };
        db.insert_holiday(&holiday).unwrap();

        assert!(db.holiday_covers(user_id, date(2026, 3, 10)).unwrap());
        assert!(db.holiday_covers(user_id, date(2026, 3, 12)).unwrap());
        assert!(!db.holiday_covers(user_id, date(2026, 3, 13)).unwrap());
        assert!(!db.holiday_covers(user_id, date(2026, 3, 9)).unwrap());
    }

    #[test]
    fn holidays_for_user_are_ordered_by_start_date() {
        let (db, user_id) = setup();
        let later = Holiday {
            id: Uuid::new_v4(),
            user_id,
            start_date: date(2026, 6, 1),
            end_date: date(2026, 6, 2),
            holiday_type: HolidayType::Sick,
            description: None,
        };
        let earlier = Holiday {
            id: Uuid::new_v4(),
            user_id,
            start_date: date(2026, 1, 1),
            end_date: date(2026, 1, 2),
            holiday_type: HolidayType::Vacation,
            description: Some("new year".into()),
        };
        db.insert_holiday(&later).unwrap();
        db.insert_holiday(&earlier).unwrap();

        let holidays = db.holidays_for_user(user_id).unwrap();
        assert_eq!(holidays[0].id, earlier.id);
        assert_eq!(holidays[1].id, later.id);
    }

    #[test]
    fn holiday_covers_ignores_other_users() {
        let (db, user_id) = setup();
        let other = User::new(2, 0, false);
        db.create_user(&other).unwrap();
        db.insert_holiday(&Holiday {
            id: Uuid::new_v4(),
            user_id: other.id,
            start_date: date(2026, 3, 10),
            end_date: date(2026, 3, 10) + Duration::days(1),
            holiday_type: HolidayType::Vacation,
            description: None,
        })
        .unwrap();

        assert!(!db.holiday_covers(user_id, date(2026, 3, 10)).unwrap());
    }
}
