//! Department API endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{not_found, success, ApiResult, VersionParams};
use crate::models::{CreateDepartmentRequest, DepartmentListItem, UpdateDepartmentRequest};
use crate::AppState;

/// GET /api/departments - All departments.
pub async fn list_departments(
    State(state): State<AppState>,
) -> ApiResult<Vec<DepartmentListItem>> {
    success(state.repo.list_departments().await?)
}

/// GET /api/departments/:id - A department with its administrator.
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<DepartmentListItem> {
    match state.repo.get_department(id).await? {
        Some(department) => success(department),
        None => Err(not_found("Department", id)),
    }
}

/// POST /api/departments - Create a department.
pub async fn create_department(
    State(state): State<AppState>,
    payload: Result<Json<CreateDepartmentRequest>, JsonRejection>,
) -> ApiResult<DepartmentListItem> {
    let Json(request) = payload?;
    let department = request.to_department()?;

    success(state.repo.create_department(&department).await?)
}

/// PUT /api/departments/:id - Update a department.
pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateDepartmentRequest>, JsonRejection>,
) -> ApiResult<DepartmentListItem> {
    let Json(request) = payload?;

    success(state.repo.update_department(id, &request).await?)
}

/// DELETE /api/departments/:id - Delete a department, keeping its courses.
pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    params: Result<Query<VersionParams>, QueryRejection>,
) -> ApiResult<()> {
    let Query(params) = params?;
    state
        .repo
        .delete_department(id, params.expected_version)
        .await?;

    success(())
}
