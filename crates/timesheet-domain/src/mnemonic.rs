use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-use BIP39 credential, free-standing until consumed.
///
/// `user_id` is `None` for a registration mnemonic (consuming it creates a
/// brand-new user) and `Some` for a login mnemonic issued to an already
/// registered user (consuming it authenticates that user). This extends the
/// bare phrase/expiry/consumed record with the minimum needed for the
/// browser side of a login to know who just authenticated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMnemonic {
    pub id: Uuid,
    pub phrase: String,
    pub expires_at: DateTime<Utc>,
    pub is_consumed: bool,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
}

impl PendingMnemonic {
    #[must_use]
    pub fn new(phrase: String, ttl: chrono::Duration, user_id: Option<Uuid>) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phrase,
            expires_at: created_at + ttl,
            is_consumed: false,
            created_at,
            user_id,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_consumed && !self.is_expired(now)
    }
}
