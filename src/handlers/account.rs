use crate::accounts::manager::update_details;
use crate::core::error::AccountError;
use crate::core::routes::ACCOUNT_HOME_PATH;
use crate::core::state::AppState;
use crate::handlers::auth::CurrentUser;
use crate::models::forms::{AccountResponse, UserDetailForm, UserView};
use crate::utils::form::parse_form;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use std::sync::Arc;

/// GET /account/
pub async fn home_handler(current: CurrentUser) -> Response {
    (
        StatusCode::OK,
        Json(AccountResponse {
            success: true,
            user: UserView::from(current.user.as_ref()),
        }),
    )
        .into_response()
}

/// POST /account/details/ (company_name)
pub async fn details_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    body: Bytes,
) -> Result<Response, AccountError> {
    let form: UserDetailForm = parse_form(&body)?;
    let user = update_details(&state, current.user.id, &form.company_name)?;

    Ok((
        StatusCode::OK,
        Json(AccountResponse {
            success: true,
            user: UserView::from(user.as_ref()),
        }),
    )
        .into_response())
}

/// GET /accounts/
pub async fn accounts_redirect_handler() -> Redirect {
    Redirect::to(ACCOUNT_HOME_PATH)
}
