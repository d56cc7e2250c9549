use crate::accounts::activation::{force_expire, regenerate, send_activation};
use crate::accounts::manager::remove_user;
use crate::core::error::AdminError;
use crate::core::state::AppState;
use crate::models::forms::{ApiKeyQuery, SuccessResponse};
use crate::utils::auth::verify_api_key;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

fn authorize(state: &AppState, params: &ApiKeyQuery, action: &str) -> Result<(), AdminError> {
    if !verify_api_key(&params.api_key, &state.config.admin.api_key) {
        warn!(action, "Unauthorized admin attempt");
        return Err(AdminError::InvalidApiKey);
    }
    Ok(())
}

fn success(message: String) -> Response {
    (
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message,
        }),
    )
        .into_response()
}

/// Close a pending activation so its link stops working
///
/// POST /admin/activations/{id}/expire?api_key=<key>
pub async fn force_expire_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<Response, AdminError> {
    authorize(&state, &params, "force_expire")?;

    if !force_expire(&state, id)? {
        return Err(AdminError::NotPending(id));
    }

    Ok(success(format!("Activation {} expired", id)))
}

/// Give a pending activation a new key and email the new link
///
/// POST /admin/activations/{id}/regenerate?api_key=<key>
pub async fn regenerate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<Response, AdminError> {
    authorize(&state, &params, "regenerate")?;

    if !regenerate(&state, id)? {
        return Err(AdminError::NotPending(id));
    }
    let sent = send_activation(&state, id).await?;

    info!(activation_id = id, sent, "Activation key regenerated by admin");
    Ok(success(format!("Activation {} regenerated and resent", id)))
}

/// Delete a user and its activation records
///
/// POST /admin/users/{id}/remove?api_key=<key>
pub async fn remove_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<Response, AdminError> {
    authorize(&state, &params, "remove_user")?;

    let user = remove_user(&state, id)?;
    Ok(success(format!("User {} removed", user.email)))
}
