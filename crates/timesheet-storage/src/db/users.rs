use anyhow::Result;
use rusqlite::{params, OptionalExtension};
use timesheet_domain::User;

use super::helpers::parse_uuid;
use super::Database;

impl Database {
    /// Insert a brand-new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. duplicate `external_id`).
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users
             (id, external_id, is_admin, utc_offset_minutes, max_work_hours, max_commute_hours,
              max_lunch_hours, lunch_reminder_hour, lunch_reminder_minute, target_work_hours,
              target_office_hours, forgot_shutdown_threshold_percent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                user.id.to_string(),
                user.external_id,
                i32::from(user.is_admin),
                user.utc_offset_minutes,
                user.max_work_hours,
                user.max_commute_hours,
                user.max_lunch_hours,
                user.lunch_reminder_hour,
                user.lunch_reminder_minute,
                user.target_work_hours,
                user.target_office_hours,
                user.forgot_shutdown_threshold_percent,
            ],
        )?;
        Ok(())
    }

    /// Look up a user by the messaging platform's external id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_user_by_external_id(&self, external_id: i64) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, external_id, is_admin, utc_offset_minutes, max_work_hours,
                        max_commute_hours, max_lunch_hours, lunch_reminder_hour,
                        lunch_reminder_minute, target_work_hours, target_office_hours,
                        forgot_shutdown_threshold_percent
                 FROM users WHERE external_id = ?1",
                params![external_id],
                Self::row_to_user,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Look up a user by internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_user_by_id(&self, id: uuid::Uuid) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, external_id, is_admin, utc_offset_minutes, max_work_hours,
                        max_commute_hours, max_lunch_hours, lunch_reminder_hour,
                        lunch_reminder_minute, target_work_hours, target_office_hours,
                        forgot_shutdown_threshold_percent
                 FROM users WHERE id = ?1",
                params![id.to_string()],
                Self::row_to_user,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Whether any user has been registered yet — used by the credential
    /// service to decide whether the next successful registration becomes
    /// the admin.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn has_any_user(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Overwrite a user's settings row in full.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET
                is_admin = ?2, utc_offset_minutes = ?3, max_work_hours = ?4,
                max_commute_hours = ?5, max_lunch_hours = ?6, lunch_reminder_hour = ?7,
                lunch_reminder_minute = ?8, target_work_hours = ?9, target_office_hours = ?10,
                forgot_shutdown_threshold_percent = ?11
             WHERE id = ?1",
            params![
                user.id.to_string(),
                i32::from(user.is_admin),
                user.utc_offset_minutes,
                user.max_work_hours,
                user.max_commute_hours,
                user.max_lunch_hours,
                user.lunch_reminder_hour,
                user.lunch_reminder_minute,
                user.target_work_hours,
                user.target_office_hours,
                user.forgot_shutdown_threshold_percent,
            ],
        )?;
        Ok(())
    }

    /// All users with a lunch reminder configured — used by the lunch
    /// reminder worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn users_with_lunch_reminder(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, external_id, is_admin, utc_offset_minutes, max_work_hours,
                    max_commute_hours, max_lunch_hours, lunch_reminder_hour,
                    lunch_reminder_minute, target_work_hours, target_office_hours,
                    forgot_shutdown_threshold_percent
             FROM users WHERE lunch_reminder_hour IS NOT NULL AND lunch_reminder_minute IS NOT NULL",
        )?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// All registered users — used by workers that sweep across everyone.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, external_id, is_admin, utc_offset_minutes, max_work_hours,
                    max_commute_hours, max_lunch_hours, lunch_reminder_hour,
                    lunch_reminder_minute, target_work_hours, target_office_hours,
                    forgot_shutdown_threshold_percent
             FROM users",
        )?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Delete a user and every row it exclusively owns.
    ///
    /// # Errors
    ///
    /// Returns an error if any delete fails.
    pub fn delete_user(&self, id: uuid::Uuid) -> Result<()> {
        let id_str = id.to_string();
        self.conn
            .execute("DELETE FROM tracking_sessions WHERE user_id = ?1", params![id_str])?;
        self.conn.execute(
            "DELETE FROM employer_attendance_records WHERE user_id = ?1",
            params![id_str],
        )?;
        self.conn
            .execute("DELETE FROM employer_import_logs WHERE user_id = ?1", params![id_str])?;
        self.conn
            .execute("DELETE FROM user_compliance_rules WHERE user_id = ?1", params![id_str])?;
        self.conn
            .execute("DELETE FROM holidays WHERE user_id = ?1", params![id_str])?;
        self.conn.execute("DELETE FROM users WHERE id = ?1", params![id_str])?;
        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            external_id: row.get(1)?,
            is_admin: row.get::<_, i32>(2)? != 0,
            utc_offset_minutes: row.get(3)?,
            max_work_hours: row.get(4)?,
            max_commute_hours: row.get(5)?,
            max_lunch_hours: row.get(6)?,
            lunch_reminder_hour: row.get(7)?,
            lunch_reminder_minute: row.get(8)?,
            target_work_hours: row.get(9)?,
            target_office_hours: row.get(10)?,
            forgot_shutdown_threshold_percent: row.get(11)?,
        })
    }
}
