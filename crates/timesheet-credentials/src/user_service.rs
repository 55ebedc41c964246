use std::sync::Arc;

use timesheet_domain::{CoreError, CoreResult, User};
use timesheet_storage::Database;
use uuid::Uuid;

/// Validates and persists changes to a registered user's settings (§3).
/// Every mutation of a `User` after registration goes through here so the
/// §3 invariants are enforced in exactly one place.
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Overwrite `user_id`'s settings with `updated`, rejecting the write if
    /// `updated` violates any §3 invariant.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidRequest` if `updated` fails validation,
    /// `CoreError::NotFound` if `user_id` has no account, or
    /// `CoreError::Internal` on a storage failure.
    pub fn update_settings(&self, user_id: Uuid, mut updated: User) -> CoreResult<User> {
        updated.id = user_id;
        updated.validate()?;

        self.db
            .get_user_by_id(user_id)
            .map_err(|e| CoreError::Internal(e.to_string()))?
            .ok_or(CoreError::NotFound)?;

        self.db
            .update_user(&updated)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(updated)
    }
}
