use axum::{
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use crate::core::error::AccountError;

pub async fn fallback_handler(headers: HeaderMap) -> Response {
    // Check if this is a browser request
    let accepts_html = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false);

    if accepts_html {
        return (StatusCode::NOT_FOUND, Html("Page not found.")).into_response();
    }

    AccountError::NotFound("no such endpoint".to_string()).into_response()
}
