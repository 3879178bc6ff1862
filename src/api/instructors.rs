//! Instructor API endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{not_found, success, ApiResult, VersionParams};
use crate::errors::AppError;
use crate::models::{
    AssignedCourseData, CreateInstructorRequest, InstructorForm, InstructorIndexData,
    InstructorSummary, OfficeAssignment, UpdateInstructorRequest, UpdateOfficeRequest,
};
use crate::AppState;

/// Drill-down selection of the instructor index.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorIndexParams {
    pub id: Option<i64>,
    pub course_id: Option<i64>,
}

/// GET /api/instructors - All instructors, optionally drilling into one.
pub async fn list_instructors(
    State(state): State<AppState>,
    params: Result<Query<InstructorIndexParams>, QueryRejection>,
) -> ApiResult<InstructorIndexData> {
    let Query(params) = params?;

    success(
        state
            .repo
            .instructor_index(params.id, params.course_id)
            .await?,
    )
}

/// GET /api/instructors/new - Course checkboxes for a blank form.
pub async fn new_instructor(State(state): State<AppState>) -> ApiResult<Vec<AssignedCourseData>> {
    success(state.repo.assigned_course_data(None).await?)
}

/// GET /api/instructors/:id - An instructor with office and courses.
pub async fn get_instructor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<InstructorSummary> {
    match state.repo.instructor_summary(id).await? {
        Some(summary) => success(summary),
        None => Err(not_found("Instructor", id)),
    }
}

/// GET /api/instructors/:id/edit - Edit form data.
pub async fn edit_instructor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<InstructorForm> {
    match state.repo.instructor_form(id).await? {
        Some(form) => success(form),
        None => Err(not_found("Instructor", id)),
    }
}

/// POST /api/instructors - Create an instructor.
pub async fn create_instructor(
    State(state): State<AppState>,
    payload: Result<Json<CreateInstructorRequest>, JsonRejection>,
) -> ApiResult<InstructorForm> {
    let Json(request) = payload?;

    success(state.repo.create_instructor(&request).await?)
}

/// PUT /api/instructors/:id - Update an instructor and their courses.
pub async fn update_instructor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateInstructorRequest>, JsonRejection>,
) -> ApiResult<InstructorForm> {
    let Json(request) = payload?;

    success(state.repo.update_instructor(id, &request).await?)
}

/// DELETE /api/instructors/:id - Delete an instructor.
pub async fn delete_instructor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    params: Result<Query<VersionParams>, QueryRejection>,
) -> ApiResult<()> {
    let Query(params) = params?;
    state
        .repo
        .delete_instructor(id, params.expected_version)
        .await?;

    success(())
}

/// GET /api/instructors/:id/office - The instructor's office.
pub async fn get_office(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<OfficeAssignment> {
    if state.repo.get_instructor(id).await?.is_none() {
        return Err(not_found("Instructor", id));
    }
    match state.repo.get_office(id).await? {
        Some(office) => success(office),
        None => Err(AppError::NotFound(format!(
            "Instructor {} has no office",
            id
        ))),
    }
}

/// PUT /api/instructors/:id/office - Assign or move the office.
pub async fn set_office(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateOfficeRequest>, JsonRejection>,
) -> ApiResult<OfficeAssignment> {
    let Json(request) = payload?;

    success(state.repo.set_office(id, &request).await?)
}

/// DELETE /api/instructors/:id/office - Remove the office.
pub async fn delete_office(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    params: Result<Query<VersionParams>, QueryRejection>,
) -> ApiResult<()> {
    let Query(params) = params?;
    state.repo.delete_office(id, params.expected_version).await?;

    success(())
}
