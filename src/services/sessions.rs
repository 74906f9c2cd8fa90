use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::session::Session;
use crate::models::user::RemoteUser;

/// The process-held session registry, keyed by the cookie-carried id.
///
/// Expiry is lazy: a lookup that finds an expired record removes it and
/// reports no session. There is no background sweep, and records do not
/// survive a restart.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, Session>>,
    ttl_hours: i64,
}

impl SessionStore {
    /// Creates an empty store whose sessions live for `ttl_hours`.
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl_hours,
        }
    }

    /// Binds a session to an authenticated user and returns its id.
    pub fn create(&self, user: &RemoteUser) -> Uuid {
        let session_id = Uuid::new_v4();
        let now = Utc::now();

        let session = Session {
            user_id: user.username.clone(),
            user_email: user.email.clone(),
            role: user.role,
            created_at: now,
            expires_at: now + chrono::Duration::hours(self.ttl_hours),
        };

        self.sessions.insert(session_id, session);
        tracing::debug!("🔑 Session created: {}", session_id);

        session_id
    }

    /// Looks up an active session, removing it if it has expired.
    pub fn get(&self, session_id: Uuid) -> Option<Session> {
        let session = self
            .sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())?;

        if session.is_expired() {
            tracing::debug!("Session expired: {}", session_id);
            self.sessions.remove(&session_id);
            return None;
        }

        Some(session)
    }

    /// Removes a session. Removing an unknown id is not an error.
    pub fn remove(&self, session_id: Uuid) -> Option<Session> {
        self.sessions.remove(&session_id).map(|(_, session)| session)
    }
}
