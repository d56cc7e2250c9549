// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub const ACCOUNT_HOME_PATH: &str = "/account/";
pub const RESEND_ACTIVATION_PATH: &str = "/account/email/resend-activation/";

/// Path of the confirmation link for `key`
pub fn email_activate_path(key: &str) -> String {
    format!("/account/email/confirm/{}/", key)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Account endpoints
        .route("/register/", post(crate::handlers::auth::register_handler))
        .route("/login/", post(crate::handlers::auth::login_handler))
        .route("/logout/", post(crate::handlers::auth::logout_handler))
        .route(ACCOUNT_HOME_PATH, get(crate::handlers::account::home_handler))
        .route("/account/details/", post(crate::handlers::account::details_handler))
        .route("/accounts/", get(crate::handlers::account::accounts_redirect_handler))
        .route(
            "/account/email/confirm/{key}/",
            get(crate::handlers::activation::confirm_handler),
        )
        .route(RESEND_ACTIVATION_PATH, post(crate::handlers::activation::resend_handler))
        .route("/health", get(crate::handlers::health::health_handler))

        // Admin endpoints (require API key)
        .route(
            "/admin/activations/{id}/expire",
            post(crate::handlers::admin::force_expire_handler),
        )
        .route(
            "/admin/activations/{id}/regenerate",
            post(crate::handlers::admin::regenerate_handler),
        )
        .route("/admin/users/{id}/remove", post(crate::handlers::admin::remove_user_handler))

        // 404 fallback for all unmatched routes
        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_activate_path() {
        assert_eq!(email_activate_path("abc123"), "/account/email/confirm/abc123/");
    }
}
