use std::sync::Arc;

use chrono::Duration;
use timesheet_domain::{CoreError, CoreResult, PendingMnemonic, User};
use timesheet_storage::Database;
use uuid::Uuid;

use crate::generate::generate_phrase;

/// Default time-to-live for an issued mnemonic (§4.5).
pub const DEFAULT_TTL: Duration = Duration::hours(1);

/// Outcome of a successful `ValidateAndConsume` (§4.5).
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// The phrase was a registration mnemonic; the caller must create the
    /// user (and admit them as the first admin if `is_first_user` is set).
    Registration { is_first_user: bool },
    /// The phrase was a login mnemonic bound to an existing user.
    Login { user_id: Uuid },
}

/// Issues and redeems BIP39 mnemonics for registration and login (§4.5).
pub struct CredentialService {
    db: Arc<Database>,
}

impl CredentialService {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Generate and persist a fresh registration mnemonic (not bound to any
    /// user).
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails or the generated phrase
    /// collides with a still-pending one (astronomically unlikely for a
    /// 24-word BIP39 phrase).
    pub fn issue_registration_mnemonic(&self, ttl: Option<Duration>) -> CoreResult<String> {
        self.store_pending(None, ttl)
    }

    /// Generate and persist a login mnemonic bound to `user_id`. Any
    /// registered user — admin or not — may request one for themselves
    /// (§4.5); admins may also request one on behalf of another user via
    /// the `generate` bot command.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails.
    pub fn issue_login_mnemonic(&self, user_id: Uuid, ttl: Option<Duration>) -> CoreResult<String> {
        self.store_pending(Some(user_id), ttl)
    }

    fn store_pending(&self, user_id: Option<Uuid>, ttl: Option<Duration>) -> CoreResult<String> {
        let phrase = generate_phrase();
        let mnemonic = PendingMnemonic::new(phrase.clone(), ttl.unwrap_or(DEFAULT_TTL), user_id);
        self.db
            .insert_pending_mnemonic(&mnemonic)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(phrase)
    }

    /// Validate and atomically consume `phrase` (§4.5, §8 property 6 / S6).
    ///
    /// Registration and login share one redemption path; the caller
    /// distinguishes the two cases via the returned [`ConsumeOutcome`].
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidMnemonic` if the phrase is unknown,
    /// expired, or already consumed.
    pub fn validate_and_consume(&self, phrase: &str) -> CoreResult<ConsumeOutcome> {
        let is_first_user = !self
            .db
            .has_any_user()
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        let mnemonic = self.db.validate_and_consume_mnemonic(phrase)?;

        Ok(match mnemonic.user_id {
            Some(user_id) => ConsumeOutcome::Login { user_id },
            None => ConsumeOutcome::Registration { is_first_user },
        })
    }

    /// Complete a registration: create the user for `external_id`, admitting
    /// them as admin iff they were the first-ever validated mnemonic
    /// (§4.5). Callers must have already consumed a `Registration` outcome
    /// from [`Self::validate_and_consume`].
    ///
    /// # Errors
    ///
    /// Returns `CoreError::AlreadyRegistered` if `external_id` already has
    /// an account.
    pub fn complete_registration(
        &self,
        external_id: i64,
        utc_offset_minutes: i32,
        is_first_user: bool,
    ) -> CoreResult<User> {
        if self
            .db
            .get_user_by_external_id(external_id)
            .map_err(|e| CoreError::Internal(e.to_string()))?
            .is_some()
        {
            return Err(CoreError::AlreadyRegistered);
        }

        let user = User::new(external_id, utc_offset_minutes, is_first_user);
        user.validate()?;
        self.db
            .create_user(&user)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(user)
    }
}
