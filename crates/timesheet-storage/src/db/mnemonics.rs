use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use timesheet_domain::{CoreError, CoreResult, PendingMnemonic};

use super::helpers::{parse_datetime, parse_uuid};
use super::Database;

impl Database {
    /// Insert a freshly generated mnemonic. The phrase is the unique key;
    /// a collision is surfaced as an error (§4.5: "collisions rejected").
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including on a duplicate
    /// phrase.
    pub fn insert_pending_mnemonic(&self, mnemonic: &PendingMnemonic) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO pending_mnemonics (id, phrase, expires_at, is_consumed, created_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                mnemonic.id.to_string(),
                mnemonic.phrase,
                mnemonic.expires_at.to_rfc3339(),
                i32::from(mnemonic.is_consumed),
                mnemonic.created_at.to_rfc3339(),
                mnemonic.user_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Atomically consume `phrase` if it exists, is unexpired, and is not
    /// already consumed. The `UPDATE ... WHERE` predicate and
    /// `rows_affected` check is itself the serialization point: SQLite
    /// executes the statement as one indivisible unit, so two concurrent
    /// callers racing on the same phrase can never both see
    /// `rows_affected() == 1` (§8 property 6 / §8 scenario S6).
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidMnemonic` if the phrase is unknown,
    /// expired, or already consumed; `CoreError::Internal` on a database
    /// failure.
    pub fn validate_and_consume_mnemonic(&self, phrase: &str) -> CoreResult<PendingMnemonic> {
        let now = Utc::now().to_rfc3339();
        let rows = self
            .conn
            .execute(
                "UPDATE pending_mnemonics SET is_consumed = 1
                 WHERE phrase = ?1 AND is_consumed = 0 AND expires_at > ?2",
                params![phrase, now],
            )
            .map_err(|e| CoreError::Internal(e.to_string()))?;

        if rows != 1 {
            return Err(CoreError::InvalidMnemonic);
        }

        self.get_pending_mnemonic(phrase)
            .map_err(|e| CoreError::Internal(e.to_string()))?
            .ok_or(CoreError::InvalidMnemonic)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_pending_mnemonic(&self, phrase: &str) -> anyhow::Result<Option<PendingMnemonic>> {
        self.conn
            .query_row(
                "SELECT id, phrase, expires_at, is_consumed, created_at, user_id
                 FROM pending_mnemonics WHERE phrase = ?1",
                params![phrase],
                Self::row_to_mnemonic,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Delete every mnemonic past its expiry — the hourly sweeper (§4.4.3).
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn sweep_expired_mnemonics(&self) -> anyhow::Result<u64> {
        let now = Utc::now().to_rfc3339();
        let rows = self
            .conn
            .execute("DELETE FROM pending_mnemonics WHERE expires_at < ?1", params![now])?;
        Ok(rows as u64)
    }

    fn row_to_mnemonic(row: &rusqlite::Row) -> rusqlite::Result<PendingMnemonic> {
        let user_id: Option<String> = row.get(5)?;
        Ok(PendingMnemonic {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            phrase: row.get(1)?,
            expires_at: parse_datetime(&row.get::<_, String>(2)?)?,
            is_consumed: row.get::<_, i32>(3)? != 0,
            created_at: parse_datetime(&row.get::<_, String>(4)?)?,
            user_id: user_id.map(|s| parse_uuid(&s)).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn registration_mnemonic_has_no_user_id() {
        let db = Database::open_in_memory().unwrap();
        let mnemonic = PendingMnemonic::new("alpha beta".into(), Duration::hours(1), None);
        db.insert_pending_mnemonic(&mnemonic).unwrap();

        let consumed = db.validate_and_consume_mnemonic("alpha beta").unwrap();
        assert!(consumed.user_id.is_none());
        assert!(consumed.is_consumed);
    }

    #[test]
    fn login_mnemonic_carries_its_user_id() {
        let db = Database::open_in_memory().unwrap();
        let user_id = uuid::Uuid::new_v4();
        let mnemonic = PendingMnemonic::new("gamma delta".into(), Duration::hours(1), Some(user_id));
        db.insert_pending_mnemonic(&mnemonic).unwrap();

        let consumed = db.validate_and_consume_mnemonic("gamma delta").unwrap();
        assert_eq!(consumed.user_id, Some(user_id));
    }

    #[test]
    fn expired_mnemonic_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let mnemonic = PendingMnemonic::new("epsilon zeta".into(), Duration::seconds(-1), None);
        db.insert_pending_mnemonic(&mnemonic).unwrap();

        let result = db.validate_and_consume_mnemonic("epsilon zeta");
        assert!(matches!(result, Err(CoreError::InvalidMnemonic)));
    }

    #[test]
    fn unknown_phrase_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let result = db.validate_and_consume_mnemonic("never issued");
        assert!(matches!(result, Err(CoreError::InvalidMnemonic)));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let db = Database::open_in_memory().unwrap();
        let expired = PendingMnemonic::new("old phrase".into(), Duration::seconds(-1), None);
        let live = PendingMnemonic::new("new phrase".into(), Duration::hours(1), None);
        db.insert_pending_mnemonic(&expired).unwrap();
        db.insert_pending_mnemonic(&live).unwrap();

        let removed = db.sweep_expired_mnemonics().unwrap();
        assert_eq!(removed, 1);
        assert!(db.get_pending_mnemonic("old phrase").unwrap().is_none());
        assert!(db.get_pending_mnemonic("new phrase").unwrap().is_some());
    }
}
