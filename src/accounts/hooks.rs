// Lifecycle hooks: key assignment before an activation record is stored,
// and the activation email that follows every new user.

use crate::accounts::activation::send_activation;
use crate::core::error::{AccountError, StoreError};
use crate::core::state::AppState;
use crate::models::activation::EmailActivation;
use crate::models::user::User;
use crate::stores::activation_store::ActivationStore;
use crate::wal::wal::WalOperation;
use anyhow::{bail, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on key re-rolls before giving up
const MAX_KEY_ATTEMPTS: usize = 32;

/// Give an open record without a key a freshly generated one that no other
/// record holds. Records that already carry a key are left untouched.
pub fn assign_activation_key(
    store: &ActivationStore,
    record: &mut EmailActivation,
    mut generate: impl FnMut() -> String,
) -> Result<()> {
    if !record.is_open() || record.key.is_some() {
        return Ok(());
    }

    for attempt in 1..=MAX_KEY_ATTEMPTS {
        let candidate = generate();
        if store.reserve_key(&candidate) {
            record.key = Some(candidate);
            return Ok(());
        }
        debug!(attempt, "Activation key collision, re-rolling");
    }

    bail!(
        "Could not generate a unique activation key after {} attempts",
        MAX_KEY_ATTEMPTS
    )
}

/// Create and store one activation record for `user_id` addressed to `email`.
/// Fails with `UserNotFound` if the owner is gone by the time the lock is held.
pub fn create_activation(
    state: &AppState,
    user_id: u64,
    email: &str,
    generate: impl FnMut() -> String,
) -> Result<Arc<EmailActivation>, AccountError> {
    let _guard = state.lock_accounts()?;

    if state.users.get(user_id).is_none() {
        return Err(StoreError::UserNotFound(user_id).into());
    }

    let mut record = EmailActivation::new(user_id, email, state.activation_days(), Utc::now());
    assign_activation_key(&state.activations, &mut record, generate)?;

    let stored = state.activations.insert(record);

    if let Err(e) = state.wal.log_operation(&WalOperation::PutActivation {
        activation: (*stored).clone(),
    }) {
        warn!(error = %e, activation_id = stored.id, "Failed to log activation to WAL, rolling back");
        state.activations.remove_record(stored.id);
        return Err(e.into());
    }

    info!(
        activation_id = stored.id,
        user_id,
        email = %stored.email,
        "Email activation created"
    );

    Ok(stored)
}

/// Runs once for every newly stored user: one activation record, then the
/// email. A failed send is returned to the caller; the records stay stored.
pub async fn on_user_created(
    state: &AppState,
    user: &User,
    generate: impl FnMut() -> String,
) -> Result<Arc<EmailActivation>, AccountError> {
    let record = create_activation(state, user.id, &user.email, generate)?;
    send_activation(state, record.id).await?;
    Ok(record)
}
