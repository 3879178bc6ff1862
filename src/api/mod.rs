//! REST API module.
//!
//! Contains all API routes and handlers. Every response is wrapped in the
//! `{ success, data }` / `{ success, error }` envelope.

mod courses;
mod departments;
mod enrollments;
mod instructors;
mod stats;
mod students;

pub use courses::*;
pub use departments::*;
pub use enrollments::*;
pub use instructors::*;
pub use stats::*;
pub use students::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// `?expectedVersion=n` accepted by every delete route.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionParams {
    #[serde(default)]
    pub expected_version: Option<i64>,
}

fn not_found(what: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} {} not found", what, id))
}
