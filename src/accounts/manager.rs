// User factory and account operations

use crate::accounts::hooks::on_user_created;
use crate::core::error::{AccountError, StoreError, ValidationError};
use crate::core::routes::RESEND_ACTIVATION_PATH;
use crate::core::state::AppState;
use crate::models::user::{Role, User};
use crate::utils::keys::random_activation_key;
use crate::utils::password::{hash_password, verify_password};
use crate::wal::wal::WalOperation;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the user factory
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub company_name: String,
    pub password: String,
    pub active: bool,
    pub role: Role,
}

impl NewUser {
    /// Self-service sign up: a client that stays inactive until the email is confirmed
    pub fn registration(email: &str, company_name: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            company_name: company_name.to_string(),
            password: password.to_string(),
            active: false,
            role: Role::Client,
        }
    }

    pub fn with_role(email: &str, company_name: &str, password: &str, role: Role) -> Self {
        Self {
            active: true,
            role,
            ..Self::registration(email, company_name, password)
        }
    }
}

/// Trim and lowercase the domain part
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidEmail(email.to_string());

    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || local.contains('@')
        || domain.len() < 3
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

/// Create a user and run the creation hook (activation record + email).
///
/// Presence and format checks happen before anything is stored. If the
/// activation email fails the user and its record remain stored and the
/// mail error is returned.
pub async fn create_user(state: &AppState, new_user: NewUser) -> Result<Arc<User>, AccountError> {
    let email = normalize_email(&new_user.email);
    let company_name = new_user.company_name.trim().to_string();

    if email.is_empty() {
        return Err(ValidationError::MissingEmail.into());
    }
    if company_name.is_empty() {
        return Err(ValidationError::MissingCompanyName.into());
    }
    if new_user.password.is_empty() {
        return Err(ValidationError::MissingPassword.into());
    }
    validate_email(&email)?;

    let password = new_user.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("Password hashing task failed")??;

    let user = state.users.insert(User {
        id: 0,
        email,
        company_name,
        password_hash,
        active: new_user.active,
        role: new_user.role,
        timestamp: Utc::now(),
    })?;

    if let Err(e) = state.wal.log_operation(&WalOperation::PutUser {
        user: (*user).clone(),
    }) {
        warn!(error = %e, user_id = user.id, "Failed to log user to WAL, rolling back");
        state.users.remove(user.id);
        return Err(e.into());
    }

    info!(
        user_id = user.id,
        email = %user.email,
        role = user.role.as_str(),
        active = user.active,
        "User created"
    );

    on_user_created(state, &user, random_activation_key).await?;

    Ok(user)
}

pub async fn create_client_user(
    state: &AppState,
    email: &str,
    company_name: &str,
    password: &str,
) -> Result<Arc<User>, AccountError> {
    create_user(state, NewUser::with_role(email, company_name, password, Role::Client)).await
}

pub async fn create_staff_user(
    state: &AppState,
    email: &str,
    company_name: &str,
    password: &str,
) -> Result<Arc<User>, AccountError> {
    create_user(state, NewUser::with_role(email, company_name, password, Role::Staff)).await
}

pub async fn create_superuser(
    state: &AppState,
    email: &str,
    company_name: &str,
    password: &str,
) -> Result<Arc<User>, AccountError> {
    create_user(state, NewUser::with_role(email, company_name, password, Role::Admin)).await
}

/// Check credentials. Inactive accounts are refused even with the right password.
pub async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Arc<User>, AccountError> {
    let email = normalize_email(email);
    let user = state
        .users
        .get_by_email(&email)
        .ok_or(AccountError::InvalidCredentials)?;

    let password = password.to_string();
    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .context("Password verification task failed")??;

    if !verified {
        return Err(AccountError::InvalidCredentials);
    }

    if !user.active {
        return Err(AccountError::InactiveAccount {
            resend_path: RESEND_ACTIVATION_PATH.to_string(),
        });
    }

    Ok(user)
}

/// Change the company name of `user_id`
pub fn update_details(
    state: &AppState,
    user_id: u64,
    company_name: &str,
) -> Result<Arc<User>, AccountError> {
    let company_name = company_name.trim();
    if company_name.is_empty() {
        return Err(ValidationError::MissingCompanyName.into());
    }

    let _guard = state.lock_accounts()?;

    let previous = state
        .users
        .get(user_id)
        .ok_or(StoreError::UserNotFound(user_id))?;

    let mut user = (*previous).clone();
    user.company_name = company_name.to_string();
    let updated = state.users.update(user)?;

    if let Err(e) = state.wal.log_operation(&WalOperation::PutUser {
        user: (*updated).clone(),
    }) {
        warn!(error = %e, user_id, "Failed to log user update to WAL, rolling back");
        state.users.update((*previous).clone())?;
        return Err(e.into());
    }

    info!(user_id, company_name = %updated.company_name, "User details updated");
    Ok(updated)
}

/// Delete a user together with its activation records and sessions
pub fn remove_user(state: &AppState, user_id: u64) -> Result<Arc<User>, AccountError> {
    let _guard = state.lock_accounts()?;

    if state.users.get(user_id).is_none() {
        return Err(StoreError::UserNotFound(user_id).into());
    }

    state.wal.log_operation(&WalOperation::RemoveUser { user_id })?;

    let user = state
        .users
        .remove(user_id)
        .ok_or(StoreError::UserNotFound(user_id))?;
    let activations = state.activations.remove_for_user(user_id);
    let sessions = state.sessions.remove_for_user(user_id);

    info!(user_id, email = %user.email, activations, sessions, "User removed");
    Ok(user)
}
