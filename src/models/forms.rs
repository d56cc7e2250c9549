use crate::models::activation::{ActivationState, EmailActivation};
use crate::models::user::{Capability, Role, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactivateEmailForm {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserDetailForm {
    pub company_name: String,
}

#[derive(Deserialize)]
pub struct ApiKeyQuery {
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Public projection of a user; never carries the password hash
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: u64,
    pub email: String,
    pub company_name: String,
    pub full_name: String,
    pub active: bool,
    pub role: Role,
    pub capabilities: &'static [Capability],
    pub timestamp: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            company_name: user.company_name.clone(),
            full_name: user.full_name().to_string(),
            active: user.active,
            role: user.role,
            capabilities: user.role.capabilities(),
            timestamp: user.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct ActivationView {
    pub id: u64,
    pub user_id: u64,
    pub email: String,
    pub state: ActivationState,
    pub timestamp: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ActivationView {
    pub fn new(record: &EmailActivation, now: DateTime<Utc>, activation_days: u32) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            email: record.email.clone(),
            state: record.state(now, activation_days),
            timestamp: record.timestamp,
            updated: record.updated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    pub success: bool,
    pub message: String,
    pub activation: ActivationView,
}
