use crate::accounts::manager::{authenticate, create_user, NewUser};
use crate::core::error::AccountError;
use crate::core::state::AppState;
use crate::models::forms::{
    AccountResponse, LoginForm, LoginResponse, RegisterForm, SuccessResponse, UserView,
};
use crate::models::user::User;
use crate::utils::auth::bearer_token;
use crate::utils::form::parse_form;
use axum::{
    body::Bytes,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

/// The user behind a valid `Authorization: Bearer <token>` header
pub struct CurrentUser {
    pub user: Arc<User>,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AccountError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AccountError::Unauthorized)?;

        let session = state
            .sessions
            .get(token, Utc::now())
            .ok_or(AccountError::Unauthorized)?;

        // the user may have been removed since the session was opened
        let user = state
            .users
            .get(session.user_id)
            .ok_or(AccountError::Unauthorized)?;

        Ok(Self {
            user,
            token: token.to_string(),
        })
    }
}

/// Sign up. The account stays inactive until the emailed link is followed.
///
/// POST /register/ (email, company_name, password)
#[instrument(skip(state, body))]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AccountError> {
    let form: RegisterForm = parse_form(&body)?;

    let user = create_user(
        &state,
        NewUser::registration(&form.email, &form.company_name, &form.password),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            success: true,
            user: UserView::from(user.as_ref()),
        }),
    )
        .into_response())
}

/// POST /login/ (email, password)
#[instrument(skip(state, body))]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AccountError> {
    let form: LoginForm = parse_form(&body)?;
    let user = authenticate(&state, &form.email, &form.password).await?;

    let (token, session) = state.sessions.create(user.id, Utc::now());
    info!(user_id = user.id, "User logged in");

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            token,
            expires_at: session.expires_at,
        }),
    )
        .into_response())
}

/// POST /logout/
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Response, AccountError> {
    state.sessions.remove(&current.token);
    info!(user_id = current.user.id, "User logged out");

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: "Logged out".to_string(),
        }),
    )
        .into_response())
}
