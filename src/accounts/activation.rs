// Activation state machine: pending -> activated | expired

use crate::accounts::hooks::{assign_activation_key, create_activation};
use crate::accounts::manager::normalize_email;
use crate::core::error::{AccountError, StoreError, ValidationError};
use crate::core::routes::email_activate_path;
use crate::core::state::AppState;
use crate::mail::OutgoingEmail;
use crate::models::activation::EmailActivation;
use crate::utils::keys::random_activation_key;
use crate::wal::wal::WalOperation;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub const ACTIVATION_SUBJECT: &str = "1-Click Email Verification";

/// Outcome of following a confirmation link
#[derive(Clone, Debug, PartialEq)]
pub enum ConfirmOutcome {
    Activated(Arc<EmailActivation>),
    AlreadyActivated,
    Unavailable,
}

fn get_record(state: &AppState, id: u64) -> Result<Arc<EmailActivation>, AccountError> {
    state
        .activations
        .get(id)
        .ok_or(AccountError::Store(StoreError::ActivationNotFound(id)))
}

pub fn can_activate(state: &AppState, id: u64) -> bool {
    can_activate_at(state, id, Utc::now())
}

/// True iff the confirmable filter still selects record `id` at `now`
pub fn can_activate_at(state: &AppState, id: u64, now: DateTime<Utc>) -> bool {
    state
        .activations
        .is_confirmable(id, now, state.activation_days())
}

pub fn activate(state: &AppState, id: u64) -> Result<bool, AccountError> {
    activate_at(state, id, Utc::now())
}

/// Activate record `id` and its owner in one step. Returns `Ok(false)`
/// without touching anything when the record is not confirmable.
pub fn activate_at(state: &AppState, id: u64, now: DateTime<Utc>) -> Result<bool, AccountError> {
    let _guard = state.lock_accounts()?;

    if !can_activate_at(state, id, now) {
        return Ok(false);
    }

    let record = get_record(state, id)?;
    let owner = state
        .users
        .get(record.user_id)
        .ok_or(StoreError::UserNotFound(record.user_id))?;

    let mut user = (*owner).clone();
    user.active = true;
    user.promote_to_client();

    let mut activated = (*record).clone();
    activated.activated = true;
    activated.updated = now;

    // one WAL entry covers both writes
    state.wal.log_operation(&WalOperation::Activate {
        activation_id: record.id,
        user_id: user.id,
        at: now,
    })?;

    state.users.update(user)?;
    state.activations.update(activated)?;

    info!(
        activation_id = record.id,
        user_id = record.user_id,
        email = %record.email,
        "Email activated"
    );

    Ok(true)
}

/// Replace the key of a pending record with a fresh one.
/// Returns `Ok(true)` when a new key was stored, `Ok(false)` for closed records.
pub fn regenerate(state: &AppState, id: u64) -> Result<bool, AccountError> {
    regenerate_with(state, id, random_activation_key)
}

pub fn regenerate_with(
    state: &AppState,
    id: u64,
    generate: impl FnMut() -> String,
) -> Result<bool, AccountError> {
    let _guard = state.lock_accounts()?;

    let record = get_record(state, id)?;
    if !record.is_open() {
        return Ok(false);
    }

    let mut updated = (*record).clone();
    updated.key = None;
    assign_activation_key(&state.activations, &mut updated, generate)?;
    updated.updated = Utc::now();

    if let Err(e) = state.wal.log_operation(&WalOperation::PutActivation {
        activation: updated.clone(),
    }) {
        if let Some(key) = &updated.key {
            state.activations.release_key(key);
        }
        return Err(e.into());
    }

    let stored = state.activations.update(updated)?;
    info!(activation_id = id, "Activation key regenerated");

    Ok(stored.key.is_some() && stored.key != record.key)
}

/// Mark a record forced-expired. Returns `Ok(false)` if it was already
/// closed (activated or forced-expired).
pub fn force_expire(state: &AppState, id: u64) -> Result<bool, AccountError> {
    let _guard = state.lock_accounts()?;

    let record = get_record(state, id)?;
    if !record.is_open() {
        return Ok(false);
    }

    let mut expired = (*record).clone();
    expired.forced_expired = true;
    expired.updated = Utc::now();

    state.wal.log_operation(&WalOperation::PutActivation {
        activation: expired.clone(),
    })?;
    state.activations.update(expired)?;

    info!(activation_id = id, "Activation forced expired");
    Ok(true)
}

/// Email the confirmation link of record `id`.
///
/// `Ok(false)` when the record is closed or has no key; otherwise whether
/// the transport reported a delivery. Transport errors are returned as-is.
pub async fn send_activation(state: &AppState, id: u64) -> Result<bool, AccountError> {
    let record = get_record(state, id)?;

    let Some(key) = record.key.as_deref().filter(|_| record.is_open()) else {
        return Ok(false);
    };

    let path = format!(
        "{}{}",
        state.config.accounts.base_url.trim_end_matches('/'),
        email_activate_path(key)
    );
    let (text_body, html_body) = state.templates.render_verification(&path, &record.email)?;

    let email = OutgoingEmail {
        subject: ACTIVATION_SUBJECT.to_string(),
        text_body,
        html_body,
        from_email: state.config.mail.from_email.clone(),
        recipients: vec![record.email.clone()],
    };

    let sent = state.mailer.send(&email).await.map_err(|e| {
        warn!(activation_id = id, email = %record.email, error = %e, "Activation email failed");
        e
    })?;

    info!(activation_id = id, email = %record.email, sent, "Activation email sent");
    Ok(sent > 0)
}

/// Follow a confirmation link
pub fn confirm_key(state: &AppState, key: &str) -> Result<ConfirmOutcome, AccountError> {
    confirm_key_at(state, key, Utc::now())
}

pub fn confirm_key_at(
    state: &AppState,
    key: &str,
    now: DateTime<Utc>,
) -> Result<ConfirmOutcome, AccountError> {
    let Some(record) = state.activations.find_by_key(key) else {
        return Ok(ConfirmOutcome::Unavailable);
    };

    if record.activated {
        return Ok(ConfirmOutcome::AlreadyActivated);
    }

    if activate_at(state, record.id, now)? {
        let activated = get_record(state, record.id)?;
        Ok(ConfirmOutcome::Activated(activated))
    } else {
        Ok(ConfirmOutcome::Unavailable)
    }
}

/// Issue a new activation record (with a new key) for the user behind
/// `email` and send it.
pub async fn resend_activation(
    state: &AppState,
    email: &str,
) -> Result<Arc<EmailActivation>, AccountError> {
    let email = normalize_email(email);

    let existing = state
        .activations
        .email_exists(&email, &state.users)
        .into_iter()
        .next()
        .ok_or_else(|| ValidationError::UnknownEmail(email.clone()))?;

    let owner = state
        .users
        .get(existing.user_id)
        .ok_or(StoreError::UserNotFound(existing.user_id))?;

    let record = create_activation(state, owner.id, &email, random_activation_key)?;
    send_activation(state, record.id).await?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::manager::{create_user, remove_user, update_details, NewUser};
    use crate::core::startup::apply_wal_operations;
    use crate::testing::{stored_user, test_context, test_context_with, TestContext};
    use chrono::Duration;
    use tempfile::TempDir;

    async fn registered(ctx: &TestContext) -> (u64, Arc<EmailActivation>) {
        let user = create_user(&ctx.state, NewUser::registration("a@x.com", "Acme", "secret123"))
            .await
            .unwrap();
        let record = ctx.state.activations.for_user(user.id).pop().unwrap();
        (user.id, record)
    }

    fn backdate(ctx: &TestContext, id: u64, age: Duration) {
        let mut record = (*ctx.state.activations.get(id).unwrap()).clone();
        record.timestamp = record.timestamp - age;
        ctx.state.activations.update(record).unwrap();
    }

    #[tokio::test]
    async fn test_activate_flips_user_and_record() {
        let ctx = test_context();
        let (user_id, record) = registered(&ctx).await;
        assert!(!ctx.state.users.get(user_id).unwrap().active);

        assert!(can_activate(&ctx.state, record.id));
        assert!(activate(&ctx.state, record.id).unwrap());

        let user = ctx.state.users.get(user_id).unwrap();
        assert!(user.active);
        assert!(user.is_client());
        assert!(ctx.state.activations.get(record.id).unwrap().activated);
    }

    #[tokio::test]
    async fn test_activated_record_is_terminal() {
        let ctx = test_context();
        let (_, record) = registered(&ctx).await;

        assert!(activate(&ctx.state, record.id).unwrap());
        assert!(!can_activate(&ctx.state, record.id));
        assert!(!activate(&ctx.state, record.id).unwrap());
        assert!(!force_expire(&ctx.state, record.id).unwrap());
        assert!(!regenerate(&ctx.state, record.id).unwrap());
    }

    #[tokio::test]
    async fn test_forced_expired_record_leaves_user_inactive() {
        let ctx = test_context();
        let (user_id, record) = registered(&ctx).await;

        assert!(force_expire(&ctx.state, record.id).unwrap());
        assert!(!activate(&ctx.state, record.id).unwrap());

        assert!(!ctx.state.users.get(user_id).unwrap().active);
        let stored = ctx.state.activations.get(record.id).unwrap();
        assert!(!stored.activated);
        assert!(stored.forced_expired);
    }

    #[tokio::test]
    async fn test_activation_window_boundary() {
        let ctx = test_context();
        let (_, record) = registered(&ctx).await;
        let now = record.timestamp + Duration::days(7);

        // exactly at the lower bound: excluded
        assert!(!can_activate_at(&ctx.state, record.id, now));
        // one microsecond inside the window
        assert!(can_activate_at(&ctx.state, record.id, now - Duration::microseconds(1)));
        // at creation time
        assert!(can_activate_at(&ctx.state, record.id, record.timestamp));
    }

    #[tokio::test]
    async fn test_expired_by_age_cannot_activate() {
        let ctx = test_context();
        let (user_id, record) = registered(&ctx).await;
        backdate(&ctx, record.id, Duration::days(8));

        assert!(!activate(&ctx.state, record.id).unwrap());
        assert!(!ctx.state.users.get(user_id).unwrap().active);
        assert!(!ctx.state.activations.get(record.id).unwrap().activated);
    }

    #[tokio::test]
    async fn test_activate_unknown_record() {
        let ctx = test_context();
        assert!(!activate(&ctx.state, 999).unwrap());
        assert!(matches!(
            regenerate(&ctx.state, 999),
            Err(AccountError::Store(StoreError::ActivationNotFound(999)))
        ));
    }

    #[tokio::test]
    async fn test_regenerate_replaces_key() {
        let ctx = test_context();
        let (_, record) = registered(&ctx).await;
        let old_key = record.key.clone().unwrap();

        assert!(regenerate_with(&ctx.state, record.id, || "freshkey".to_string()).unwrap());

        let stored = ctx.state.activations.get(record.id).unwrap();
        assert_eq!(stored.key.as_deref(), Some("freshkey"));
        assert!(ctx.state.activations.find_by_key(&old_key).is_none());
        assert_eq!(ctx.state.activations.find_by_key("freshkey").unwrap().id, record.id);
    }

    #[tokio::test]
    async fn test_send_activation_embeds_key() {
        let ctx = test_context();
        let (_, record) = registered(&ctx).await;
        let key = record.key.clone().unwrap();

        assert!(send_activation(&ctx.state, record.id).await.unwrap());

        let outbox = ctx.mailer.outbox();
        // once from registration, once from the explicit send
        assert_eq!(outbox.len(), 2);
        let email = outbox.last().unwrap();
        assert_eq!(email.subject, ACTIVATION_SUBJECT);
        assert_eq!(email.recipients, vec!["a@x.com".to_string()]);
        assert_eq!(email.from_email, "noreply@dabuch.com");
        let link = format!("https://accounts.test/account/email/confirm/{}/", key);
        assert!(email.text_body.contains(&link));
        assert!(email.html_body.contains(&link));
    }

    #[tokio::test]
    async fn test_send_activation_skips_closed_records() {
        let ctx = test_context();
        let (_, record) = registered(&ctx).await;
        force_expire(&ctx.state, record.id).unwrap();

        assert!(!send_activation(&ctx.state, record.id).await.unwrap());
        assert_eq!(ctx.mailer.outbox().len(), 1);
    }

    #[tokio::test]
    async fn test_send_activation_propagates_transport_error() {
        let ctx = test_context();
        let (_, record) = registered(&ctx).await;
        ctx.mailer.set_failing(true);

        assert!(matches!(
            send_activation(&ctx.state, record.id).await,
            Err(AccountError::Mail(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_key_outcomes() {
        let ctx = test_context();
        let (_, record) = registered(&ctx).await;
        let key = record.key.clone().unwrap();

        assert_eq!(confirm_key(&ctx.state, "nosuchkey").unwrap(), ConfirmOutcome::Unavailable);
        assert!(matches!(
            confirm_key(&ctx.state, &key).unwrap(),
            ConfirmOutcome::Activated(activated) if activated.activated
        ));
        assert_eq!(confirm_key(&ctx.state, &key).unwrap(), ConfirmOutcome::AlreadyActivated);
    }

    #[tokio::test]
    async fn test_confirm_key_after_window() {
        let ctx = test_context();
        let (user_id, record) = registered(&ctx).await;
        let key = record.key.clone().unwrap();

        let later = Utc::now() + Duration::days(8);
        assert_eq!(confirm_key_at(&ctx.state, &key, later).unwrap(), ConfirmOutcome::Unavailable);
        assert!(!ctx.state.users.get(user_id).unwrap().active);
    }

    #[tokio::test]
    async fn test_resend_creates_new_record_with_new_key() {
        let ctx = test_context();
        let (user_id, record) = registered(&ctx).await;

        let resent = resend_activation(&ctx.state, "A@X.COM").await;
        // domain is normalized, local part is not
        assert!(matches!(
            resent,
            Err(AccountError::Validation(ValidationError::UnknownEmail(_)))
        ));

        let resent = resend_activation(&ctx.state, "a@X.com").await.unwrap();
        assert_ne!(resent.id, record.id);
        assert_ne!(resent.key, record.key);
        assert_eq!(resent.user_id, user_id);
        assert_eq!(ctx.state.activations.for_user(user_id).len(), 2);
        assert_eq!(ctx.mailer.outbox().len(), 2);
    }

    #[tokio::test]
    async fn test_resend_after_activation_rejected() {
        let ctx = test_context();
        let (_, record) = registered(&ctx).await;
        activate(&ctx.state, record.id).unwrap();

        assert!(matches!(
            resend_activation(&ctx.state, "a@x.com").await,
            Err(AccountError::Validation(ValidationError::UnknownEmail(_)))
        ));
    }

    /// Logged user with one pending record, without the password hashing cost
    fn pending(ctx: &TestContext) -> (u64, Arc<EmailActivation>) {
        let user = stored_user(&ctx.state, "a@x.com", "Acme");
        ctx.state
            .wal
            .log_operation(&WalOperation::PutUser {
                user: (*user).clone(),
            })
            .unwrap();
        let record = create_activation(&ctx.state, user.id, &user.email, random_activation_key).unwrap();
        (user.id, record)
    }

    /// Rebuild a state from the WAL the way startup does
    fn replayed(ctx: &TestContext) -> TestContext {
        let restored = test_context_with(TempDir::new().unwrap(), (*ctx.state.config).clone());
        let ops = restored.state.wal.replay().unwrap();
        apply_wal_operations(&restored.state, &ops).unwrap();
        restored
    }

    #[tokio::test]
    async fn test_detail_update_waits_for_account_lock() {
        let ctx = test_context();
        let (user_id, _) = registered(&ctx).await;
        let state = Arc::clone(&ctx.state);

        let guard = ctx.state.lock_accounts().unwrap();
        let writer = std::thread::spawn(move || {
            update_details(&state, user_id, "Acme Ltd").map(|user| user.company_name.clone())
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(ctx.state.users.get(user_id).unwrap().company_name, "Acme");

        drop(guard);
        assert_eq!(writer.join().unwrap().unwrap(), "Acme Ltd");
    }

    #[test]
    fn test_activation_keeps_concurrent_detail_update() {
        for _ in 0..50 {
            let ctx = test_context();
            let (user_id, record) = pending(&ctx);

            std::thread::scope(|scope| {
                scope.spawn(|| {
                    activate(&ctx.state, record.id).unwrap();
                });
                scope.spawn(|| {
                    update_details(&ctx.state, user_id, "Acme Ltd").unwrap();
                });
            });

            let live = ctx.state.users.get(user_id).unwrap();
            assert!(live.active);
            assert_eq!(live.company_name, "Acme Ltd");

            let restored = replayed(&ctx);
            assert_eq!(*restored.state.users.get(user_id).unwrap(), *live);
        }
    }

    #[tokio::test]
    async fn test_activation_after_owner_removed_is_not_logged() {
        let ctx = test_context();
        let (user_id, record) = registered(&ctx).await;

        remove_user(&ctx.state, user_id).unwrap();
        assert!(!activate(&ctx.state, record.id).unwrap());

        let ops = ctx.state.wal.replay().unwrap();
        assert!(!ops
            .iter()
            .any(|op| matches!(op, WalOperation::Activate { .. })));
    }

    #[test]
    fn test_concurrent_activation_and_removal_match_replay() {
        for _ in 0..50 {
            let ctx = test_context();
            let (user_id, record) = pending(&ctx);

            std::thread::scope(|scope| {
                scope.spawn(|| {
                    activate(&ctx.state, record.id).unwrap();
                });
                scope.spawn(|| {
                    remove_user(&ctx.state, user_id).unwrap();
                });
            });

            assert!(ctx.state.users.is_empty());
            assert!(ctx.state.activations.is_empty());

            let restored = replayed(&ctx);
            assert!(restored.state.users.is_empty());
            assert!(restored.state.activations.is_empty());
        }
    }

    #[tokio::test]
    async fn test_resend_after_owner_removed() {
        let ctx = test_context();
        let (user_id, _) = registered(&ctx).await;
        remove_user(&ctx.state, user_id).unwrap();

        assert!(matches!(
            resend_activation(&ctx.state, "a@x.com").await,
            Err(AccountError::Validation(ValidationError::UnknownEmail(_)))
        ));
        assert!(ctx.state.activations.is_empty());
    }
}
