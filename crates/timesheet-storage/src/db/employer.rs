use chrono::{NaiveDate, Utc};
use rusqlite::params;
use timesheet_domain::EmployerAttendanceRecord;
use uuid::Uuid;

use super::helpers::{parse_date, parse_time, parse_uuid};
use super::Database;

impl Database {
    /// Replace every attendance record for `user_id` in `[from, to]` with
    /// `records` in one commit (§3: "refreshed by replacing the user's
    /// range in one transaction").
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is committed on
    /// failure.
    pub fn replace_employer_attendance_range(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        records: &[EmployerAttendanceRecord],
    ) -> anyhow::Result<()> {
        self.with_transaction(|| {
            self.conn.execute(
                "DELETE FROM employer_attendance_records
                 WHERE user_id = ?1 AND date >= ?2 AND date <= ?3",
                params![user_id.to_string(), from.to_string(), to.to_string()],
            )?;

            for record in records {
                self.conn.execute(
                    "INSERT INTO employer_attendance_records
                     (id, user_id, date, clock_in, clock_out, working_hours, has_conflict, conflict_description)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record.id.to_string(),
                        record.user_id.to_string(),
                        record.date.to_string(),
                        record.clock_in.map(|t| t.format("%H:%M:%S").to_string()),
                        record.clock_out.map(|t| t.format("%H:%M:%S").to_string()),
                        record.working_hours,
                        i32::from(record.has_conflict),
                        record.conflict_description,
                    ],
                )?;
            }

            self.conn.execute(
                "INSERT INTO employer_import_logs (id, user_id, imported_at, record_count)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id.to_string(),
                    Utc::now().to_rfc3339(),
                    i64::try_from(records.len()).unwrap_or(i64::MAX),
                ],
            )?;

            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn employer_attendance_range(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<EmployerAttendanceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, date, clock_in, clock_out, working_hours, has_conflict, conflict_description
             FROM employer_attendance_records
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;
        let records = stmt
            .query_map(
                params![user_id.to_string(), from.to_string(), to.to_string()],
                Self::row_to_record,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<EmployerAttendanceRecord> {
        let clock_in_raw: Option<String> = row.get(3)?;
        let clock_out_raw: Option<String> = row.get(4)?;
        Ok(EmployerAttendanceRecord {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            user_id: parse_uuid(&row.get::<_, String>(1)?)?,
            date: parse_date(&row.get::<_, String>(2)?)?,
            clock_in: clock_in_raw.map(|s| parse_time(&s)).transpose()?,
            clock_out: clock_out_raw.map(|s| parse_time(&s)).transpose()?,
            working_hours: row.get(5)?,
            has_conflict: row.get::<_, i32>(6)? != 0,
            conflict_description: row.get(7)?,
        })
    }
}
