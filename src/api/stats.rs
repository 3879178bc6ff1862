//! Statistics endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::EnrollmentDateGroup;
use crate::AppState;

/// GET /api/stats/enrollment-dates - Student counts per enrollment date.
pub async fn enrollment_dates(State(state): State<AppState>) -> ApiResult<Vec<EnrollmentDateGroup>> {
    success(state.repo.enrollment_date_groups().await?)
}
