use crate::accounts::activation::{confirm_key, resend_activation, ConfirmOutcome};
use crate::core::error::AccountError;
use crate::core::routes::RESEND_ACTIVATION_PATH;
use crate::core::state::AppState;
use crate::models::forms::{ActivationResponse, ActivationView, ReactivateEmailForm, SuccessResponse};
use crate::utils::form::parse_form;
use crate::utils::keys::is_valid_key;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Follow a confirmation link
///
/// GET /account/email/confirm/{key}/
#[instrument(skip(state))]
pub async fn confirm_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, AccountError> {
    if !is_valid_key(&key) {
        return Err(AccountError::NotFound("activation key".to_string()));
    }

    match confirm_key(&state, &key)? {
        ConfirmOutcome::Activated(record) => Ok((
            StatusCode::OK,
            Json(ActivationResponse {
                success: true,
                message: "Thank you for confirming your email. You can now log in.".to_string(),
                activation: ActivationView::new(&record, Utc::now(), state.activation_days()),
            }),
        )
            .into_response()),
        ConfirmOutcome::AlreadyActivated => Ok((
            StatusCode::OK,
            Json(SuccessResponse {
                success: true,
                message: "Your email has already been confirmed.".to_string(),
            }),
        )
            .into_response()),
        ConfirmOutcome::Unavailable => {
            debug!("Confirmation link invalid or expired");
            Err(AccountError::ActivationUnavailable {
                resend_path: RESEND_ACTIVATION_PATH.to_string(),
            })
        }
    }
}

/// Send a fresh confirmation link to an address with a pending activation
///
/// POST /account/email/resend-activation/ (email)
#[instrument(skip(state, body))]
pub async fn resend_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AccountError> {
    let form: ReactivateEmailForm = parse_form(&body)?;
    resend_activation(&state, &form.email).await?;

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: "Activation link sent, please check your email.".to_string(),
        }),
    )
        .into_response())
}
