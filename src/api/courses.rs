//! Course API endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{not_found, success, ApiResult, VersionParams};
use crate::models::{
    CourseForm, CourseListItem, CreateCourseRequest, CreditsUpdateResult, DepartmentOption,
    UpdateCourseRequest, UpdateCreditsRequest,
};
use crate::AppState;

/// GET /api/courses - All courses with department names.
pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Vec<CourseListItem>> {
    success(state.repo.list_courses().await?)
}

/// GET /api/courses/new - Department choices for a blank form.
pub async fn new_course(State(state): State<AppState>) -> ApiResult<Vec<DepartmentOption>> {
    success(state.repo.department_options(None).await?)
}

/// GET /api/courses/:id - A single course.
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<CourseListItem> {
    match state.repo.get_course(id).await? {
        Some(course) => success(course),
        None => Err(not_found("Course", id)),
    }
}

/// GET /api/courses/:id/edit - Course with the department dropdown.
pub async fn edit_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<CourseForm> {
    match state.repo.course_form(id).await? {
        Some(form) => success(form),
        None => Err(not_found("Course", id)),
    }
}

/// POST /api/courses - Create a course.
pub async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> ApiResult<CourseListItem> {
    let Json(request) = payload?;
    let course = request.into_course()?;

    success(state.repo.create_course(&course).await?)
}

/// PUT /api/courses/:id - Update a course.
pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> ApiResult<CourseListItem> {
    let Json(request) = payload?;

    success(state.repo.update_course(id, &request).await?)
}

/// DELETE /api/courses/:id - Delete a course.
pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    params: Result<Query<VersionParams>, QueryRejection>,
) -> ApiResult<()> {
    let Query(params) = params?;
    state.repo.delete_course(id, params.expected_version).await?;

    success(())
}

/// POST /api/courses/credits - Multiply the credits of every course.
pub async fn update_credits(
    State(state): State<AppState>,
    payload: Result<Json<UpdateCreditsRequest>, JsonRejection>,
) -> ApiResult<CreditsUpdateResult> {
    let Json(request) = payload?;
    let multiplier = request.multiplier()?;
    let rows_affected = state.repo.multiply_course_credits(multiplier).await?;

    success(CreditsUpdateResult {
        multiplier,
        rows_affected,
    })
}
