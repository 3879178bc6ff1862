//! Student API endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{not_found, success, ApiResult, VersionParams};
use crate::models::{
    CreateStudentRequest, DeleteConfirmation, Student, StudentDetails, StudentIndex,
    StudentSortField, UpdateStudentRequest,
};
use crate::paging::{PageRequest, SortOrder};
use crate::AppState;

/// Shown when a previous delete attempt failed.
pub const DELETE_FAILED_MESSAGE: &str =
    "Delete failed. Try again, and if the problem persists see your system administrator.";

/// Query parameters of the student list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListParams {
    pub sort_order: Option<String>,
    pub current_filter: Option<String>,
    pub search_string: Option<String>,
    pub page_number: Option<i64>,
}

/// Query parameters of the delete confirmation view.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfirmationParams {
    #[serde(default)]
    pub save_changes_error: bool,
}

/// GET /api/students - One page of students, sorted and filtered.
pub async fn list_students(
    State(state): State<AppState>,
    params: Result<Query<StudentListParams>, QueryRejection>,
) -> ApiResult<StudentIndex> {
    let Query(params) = params?;

    let request = PageRequest::<StudentSortField>::from_params(
        params.sort_order.as_deref(),
        params.current_filter.as_deref(),
        params.search_string.as_deref(),
        params.page_number,
        state.config.page_size,
    )?;

    let page = state.repo.list_students(&request).await?;
    let current = request.sort.as_ref();

    success(StudentIndex {
        page,
        current_sort: current.map(SortOrder::to_param).unwrap_or_default(),
        current_filter: request.filter.clone(),
        name_sort_param: SortOrder::toggle_param(current, StudentSortField::LastName),
        date_sort_param: SortOrder::toggle_param(current, StudentSortField::EnrollmentDate),
    })
}

/// GET /api/students/:id - A student with enrollments.
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StudentDetails> {
    match state.repo.student_details(id).await? {
        Some(details) => success(details),
        None => Err(not_found("Student", id)),
    }
}

/// POST /api/students - Create a new student.
pub async fn create_student(
    State(state): State<AppState>,
    payload: Result<Json<CreateStudentRequest>, JsonRejection>,
) -> ApiResult<Student> {
    let Json(request) = payload?;
    request.validate()?;

    success(state.repo.create_student(&request).await?)
}

/// PUT /api/students/:id - Update a student.
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateStudentRequest>, JsonRejection>,
) -> ApiResult<Student> {
    let Json(request) = payload?;

    success(state.repo.update_student(id, &request).await?)
}

/// GET /api/students/:id/delete - The student about to be deleted.
pub async fn confirm_delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    params: Result<Query<DeleteConfirmationParams>, QueryRejection>,
) -> ApiResult<DeleteConfirmation<Student>> {
    let Query(params) = params?;
    let student = state
        .repo
        .get_student(id)
        .await?
        .ok_or_else(|| not_found("Student", id))?;

    success(DeleteConfirmation {
        record: student,
        error_message: params
            .save_changes_error
            .then(|| DELETE_FAILED_MESSAGE.to_string()),
    })
}

/// DELETE /api/students/:id - Delete a student and their enrollments.
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    params: Result<Query<VersionParams>, QueryRejection>,
) -> ApiResult<()> {
    let Query(params) = params?;
    state.repo.delete_student(id, params.expected_version).await?;

    success(())
}
