//! Department persistence.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::repository::{check_delete_version, check_expected_version, person_exists};
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Department, DepartmentListItem, PersonName, PersonRole, UpdateDepartmentRequest,
};

const DEPARTMENT_SELECT: &str = r#"
    SELECT d.department_id, d.name, d.budget, d.start_date, d.instructor_id, d.version,
           p.last_name, p.first_name
    FROM departments d
    LEFT JOIN people p ON p.id = d.instructor_id"#;

impl Repository {
    /// All departments ordered by name, with administrator names.
    pub async fn list_departments(&self) -> Result<Vec<DepartmentListItem>, AppError> {
        let sql = format!("{} ORDER BY d.name, d.department_id", DEPARTMENT_SELECT);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(department_item_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Get a department by ID.
    pub async fn get_department(&self, id: i64) -> Result<Option<DepartmentListItem>, AppError> {
        let sql = format!("{} WHERE d.department_id = ?", DEPARTMENT_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(department_item_from_row).transpose()?)
    }

    /// Create a new department.
    pub async fn create_department(
        &self,
        department: &Department,
    ) -> Result<DepartmentListItem, AppError> {
        let mut conn = self.pool.acquire().await?;
        check_administrator(&mut conn, department.instructor_id).await?;

        let id = sqlx::query(
            "INSERT INTO departments (name, budget, start_date, instructor_id, version) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(&department.name)
        .bind(department.budget)
        .bind(department.start_date)
        .bind(department.instructor_id)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        drop(conn);

        tracing::info!(department_id = id, "Created department");
        self.get_department(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Department {} vanished after insert", id)))
    }

    /// Update a department with optimistic concurrency control.
    pub async fn update_department(
        &self,
        id: i64,
        request: &UpdateDepartmentRequest,
    ) -> Result<DepartmentListItem, AppError> {
        let existing = self
            .get_department(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))?
            .department;

        check_expected_version(
            &format!("Department {}", id),
            request.expected_version,
            existing.version,
        )?;

        let updated = request.apply_to(&existing)?;

        let mut conn = self.pool.acquire().await?;
        check_administrator(&mut conn, updated.instructor_id).await?;

        let result = sqlx::query(
            "UPDATE departments SET name = ?, budget = ?, start_date = ?, instructor_id = ?, version = ? WHERE department_id = ? AND version = ?",
        )
        .bind(&updated.name)
        .bind(updated.budget)
        .bind(updated.start_date)
        .bind(updated.instructor_id)
        .bind(existing.version + 1)
        .bind(id)
        .bind(existing.version)
        .execute(&mut *conn)
        .await?;
        drop(conn);

        if result.rows_affected() == 0 {
            let current = self.get_department(id).await?;
            return Err(AppError::update_conflict(
                "Concurrent modification detected",
                current.map(|d| d.department.version).unwrap_or(0),
            ));
        }

        self.get_department(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))
    }

    /// Delete a department; its courses are kept without a department.
    pub async fn delete_department(
        &self,
        id: i64,
        expected_version: Option<i64>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current: i64 = sqlx::query("SELECT version FROM departments WHERE department_id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))?
            .try_get("version")?;

        check_delete_version(&format!("Department {}", id), expected_version, current)?;

        let detached =
            sqlx::query("UPDATE courses SET department_id = NULL WHERE department_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let result = sqlx::query("DELETE FROM departments WHERE department_id = ? AND version = ?")
            .bind(id)
            .bind(current)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::delete_conflict(
                "Delete failed: the department was modified by another user",
                current,
            ));
        }

        tx.commit().await?;
        tracing::info!(department_id = id, courses_detached = detached, "Deleted department");
        Ok(())
    }
}

/// A department administrator must be an existing instructor.
async fn check_administrator(
    conn: &mut SqliteConnection,
    instructor_id: Option<i64>,
) -> Result<(), AppError> {
    if let Some(id) = instructor_id {
        if !person_exists(conn, PersonRole::Instructor, id).await? {
            return Err(AppError::Validation(format!(
                "Instructor {} does not exist",
                id
            )));
        }
    }
    Ok(())
}

fn department_item_from_row(row: &SqliteRow) -> Result<DepartmentListItem, sqlx::Error> {
    let last_name: Option<String> = row.try_get("last_name")?;
    let first_name: Option<String> = row.try_get("first_name")?;
    let administrator_name = last_name
        .zip(first_name)
        .map(|(last, first)| PersonName::new(last, first).full_name());

    Ok(DepartmentListItem {
        department: Department {
            department_id: row.try_get("department_id")?,
            name: row.try_get("name")?,
            budget: row.try_get("budget")?,
            start_date: row.try_get("start_date")?,
            instructor_id: row.try_get("instructor_id")?,
            version: row.try_get("version")?,
        },
        administrator_name,
    })
}
