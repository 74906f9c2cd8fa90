use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::Role;

/// Represents one authenticated browser.
///
/// Fields are bound once from the `authenticate` reply and never updated in
/// place. A browser whose cookie resolves to no record is anonymous
/// everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The username this session belongs to.
    pub user_id: String,
    /// The email recorded for the user.
    pub user_email: String,
    /// The role recorded for the user.
    pub role: Role,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has passed its expiry.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
