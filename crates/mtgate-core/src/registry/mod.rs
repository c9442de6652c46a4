//! Local user registry.
//!
//! One record per chat user. Records are logically deactivated on
//! revocation, never deleted, so the secret and creation time stay
//! available for audit. The coordinator itself never touches the
//! registry: callers write to it only after a coordinator call
//! succeeded.

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, Secret};

pub use store::FileRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: i64,
    pub display_name: String,
    pub secret: Secret,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Key-value contract the core needs from user storage.
pub trait UserRegistry: Send + Sync {
    /// Look up a record by user id, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Registry`] when the backing store fails.
    fn get(&self, user_id: i64) -> Result<Option<UserRecord>>;

    /// Create or reactivate a record with a (possibly new) secret.
    /// Reactivation preserves the original `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Registry`] when persistence fails.
    fn upsert(&self, user_id: i64, display_name: &str, secret: &Secret) -> Result<()>;

    /// Mark a record inactive. Returns false if no record exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Registry`] when persistence fails.
    fn deactivate(&self, user_id: i64) -> Result<bool>;

    /// All currently active records.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Registry`] when the backing store fails.
    fn list_active(&self) -> Result<Vec<UserRecord>>;
}
