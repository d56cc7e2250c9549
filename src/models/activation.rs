use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One-time email confirmation record owned by a user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmailActivation {
    pub id: u64,
    pub user_id: u64,
    /// Address the confirmation link is sent to
    pub email: String,
    /// Assigned once, before the record is first stored
    pub key: Option<String>,
    pub activated: bool,
    pub forced_expired: bool,
    /// Window length in days recorded at creation
    pub expires: u32,
    pub timestamp: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationState {
    Pending,
    Activated,
    Expired,
}

impl EmailActivation {
    /// A record that has not been stored yet; the store assigns `id` and `key`.
    pub fn new(user_id: u64, email: impl Into<String>, expires: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id,
            email: email.into(),
            key: None,
            activated: false,
            forced_expired: false,
            expires,
            timestamp: now,
            updated: now,
        }
    }

    /// Neither activated nor forced-expired
    pub fn is_open(&self) -> bool {
        !self.activated && !self.forced_expired
    }

    /// `now - window < timestamp <= now` on an open record
    pub fn is_confirmable(&self, now: DateTime<Utc>, activation_days: u32) -> bool {
        let start = now - Duration::days(i64::from(activation_days));
        self.is_open() && self.timestamp > start && self.timestamp <= now
    }

    pub fn state(&self, now: DateTime<Utc>, activation_days: u32) -> ActivationState {
        if self.activated {
            ActivationState::Activated
        } else if self.is_confirmable(now, activation_days) {
            ActivationState::Pending
        } else {
            ActivationState::Expired
        }
    }
}
