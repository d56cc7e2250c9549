use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;

/// Bytes of randomness in a session token (hex-encoded on the wire)
const TOKEN_BYTES: usize = 32;

#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Login sessions keyed by opaque bearer token
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Open a session for `user_id`, returning its token
    pub fn create(&self, user_id: u64, now: DateTime<Utc>) -> (String, Session) {
        let session = Session {
            user_id,
            created_at: now,
            expires_at: now + self.ttl,
        };

        loop {
            let mut bytes = [0u8; TOKEN_BYTES];
            rand::rng().fill(&mut bytes);
            let token = hex::encode(bytes);
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.sessions.entry(token.clone()) {
                slot.insert(session.clone());
                return (token, session);
            }
        }
    }

    /// Resolve a token to a live session; expired sessions are dropped on sight
    pub fn get(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let session = self.sessions.get(token).map(|entry| entry.value().clone())?;
        if session.expires_at <= now {
            self.sessions.remove(token);
            return None;
        }
        Some(session)
    }

    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every session belonging to `user_id`
    pub fn remove_for_user(&self, user_id: u64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.user_id != user_id);
        before.saturating_sub(self.sessions.len())
    }

    /// Remove expired sessions, returning how many were dropped
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
