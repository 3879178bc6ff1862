//! Maintenance key guard.
//!
//! Protects bulk maintenance routes with a shared key, compared in constant
//! time. Ordinary CRUD routes are not guarded.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the maintenance key.
pub const MAINTENANCE_KEY_HEADER: &str = "x-maintenance-key";

/// Middleware requiring `expected_key` when one is configured.
pub async fn maintenance_key_layer(
    expected_key: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // No key configured: maintenance routes are open
    let Some(expected) = expected_key else {
        return next.run(request).await;
    };

    let authorized =
        provided_key(&request).map(|provided| constant_time_compare(provided, &expected));

    match authorized {
        Some(true) => next.run(request).await,
        Some(false) => {
            tracing::warn!(path = %request.uri().path(), "Rejected invalid maintenance key");
            AppError::Unauthorized("Invalid maintenance key".to_string()).into_response()
        }
        None => AppError::Unauthorized("Missing maintenance key".to_string()).into_response(),
    }
}

/// Key from `x-maintenance-key`, falling back to a bearer token.
fn provided_key(request: &Request) -> Option<&str> {
    let headers = request.headers();
    headers
        .get(MAINTENANCE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
