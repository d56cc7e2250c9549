// Centralized error handling for the account service

use crate::models::forms::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

/// Rejected user input at account creation or update
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Users must have an email address")]
    MissingEmail,

    #[error("Users must have a company name")]
    MissingCompanyName,

    #[error("Users must have a password")]
    MissingPassword,

    #[error("Enter a valid email address: {0}")]
    InvalidEmail(String),

    #[error("No pending activation found for {0}")]
    UnknownEmail(String),

    #[error("Malformed form data: {0}")]
    MalformedForm(String),
}

/// Constraint violations and lookups against the in-memory stores
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("A user with email {0} already exists")]
    EmailTaken(String),

    #[error("A user with company name {0} already exists")]
    CompanyNameTaken(String),

    #[error("User {0} not found")]
    UserNotFound(u64),

    #[error("Activation {0} not found")]
    ActivationNotFound(u64),
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Failed to render template {name}: {reason}")]
    Template { name: String, reason: String },

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

/// Errors returned by the public account endpoints
#[derive(Error, Debug)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This email has not been confirmed. Request a new link at {resend_path}")]
    InactiveAccount { resend_path: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Your email could not be confirmed. The link is invalid or expired, request a new one at {resend_path}")]
    ActivationUnavailable { resend_path: String },

    #[error("Failed to send activation email: {0}")]
    Mail(#[from] MailError),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = match &self {
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::Store(StoreError::EmailTaken(_))
            | AccountError::Store(StoreError::CompanyNameTaken(_)) => StatusCode::CONFLICT,
            AccountError::Store(_) => StatusCode::NOT_FOUND,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::InactiveAccount { .. } => StatusCode::FORBIDDEN,
            AccountError::Unauthorized => StatusCode::UNAUTHORIZED,
            AccountError::NotFound(_) => StatusCode::NOT_FOUND,
            AccountError::ActivationUnavailable { .. } => StatusCode::BAD_REQUEST,
            AccountError::Mail(_) => StatusCode::BAD_GATEWAY,
            AccountError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, "Account request failed");
        }

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Activation {0} is no longer pending")]
    NotPending(u64),

    #[error("Failed to send activation email: {0}")]
    Mail(#[from] MailError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        AdminError::NotFound(err.to_string())
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        AdminError::InternalError(err.to_string())
    }
}

impl From<AccountError> for AdminError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Store(e) => e.into(),
            AccountError::NotFound(what) => AdminError::NotFound(what),
            AccountError::Mail(e) => AdminError::Mail(e),
            other => AdminError::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AdminError::InvalidApiKey => (StatusCode::UNAUTHORIZED, self.to_string()),
            AdminError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AdminError::NotPending(_) => (StatusCode::CONFLICT, self.to_string()),
            AdminError::Mail(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AdminError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: error_message,
            }),
        )
            .into_response()
    }
}
