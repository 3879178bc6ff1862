//! Enrollment API endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{not_found, success, ApiResult, VersionParams};
use crate::models::{CreateEnrollmentRequest, EnrollmentDetail, UpdateEnrollmentRequest};
use crate::paging::{paginate, Page};
use crate::AppState;

/// Filters of the enrollment list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentListParams {
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
    pub page_number: Option<i64>,
}

/// GET /api/enrollments - One page of enrollments.
pub async fn list_enrollments(
    State(state): State<AppState>,
    params: Result<Query<EnrollmentListParams>, QueryRejection>,
) -> ApiResult<Page<EnrollmentDetail>> {
    let Query(params) = params?;
    let enrollments = state
        .repo
        .list_enrollments(params.student_id, params.course_id)
        .await?;

    success(paginate(
        &enrollments,
        params.page_number,
        state.config.page_size,
    )?)
}

/// GET /api/enrollments/:id - A single enrollment.
pub async fn get_enrollment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<EnrollmentDetail> {
    match state.repo.get_enrollment(id).await? {
        Some(enrollment) => success(enrollment),
        None => Err(not_found("Enrollment", id)),
    }
}

/// POST /api/enrollments - Enroll a student in a course.
pub async fn create_enrollment(
    State(state): State<AppState>,
    payload: Result<Json<CreateEnrollmentRequest>, JsonRejection>,
) -> ApiResult<EnrollmentDetail> {
    let Json(request) = payload?;

    success(state.repo.create_enrollment(&request).await?)
}

/// PUT /api/enrollments/:id - Set or clear a grade.
pub async fn update_enrollment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateEnrollmentRequest>, JsonRejection>,
) -> ApiResult<EnrollmentDetail> {
    let Json(request) = payload?;

    success(state.repo.update_enrollment(id, &request).await?)
}

/// DELETE /api/enrollments/:id - Remove an enrollment.
pub async fn delete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    params: Result<Query<VersionParams>, QueryRejection>,
) -> ApiResult<()> {
    let Query(params) = params?;
    state
        .repo
        .delete_enrollment(id, params.expected_version)
        .await?;

    success(())
}
