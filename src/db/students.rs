//! Student persistence.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::{check_delete_version, check_expected_version, like_pattern};
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    CreateStudentRequest, EnrollmentDateGroup, PersonName, Student, StudentDetails,
    StudentSortField, UpdateStudentRequest,
};
use crate::paging::{Page, PageRequest};

const STUDENT_COLUMNS: &str = "id, last_name, first_name, enrollment_date, version";

/// Binds: the filter pattern three times (null check, last name, first name).
const STUDENT_FILTER: &str = "role = 'student' AND (? IS NULL OR last_name LIKE ? ESCAPE '\\' OR first_name LIKE ? ESCAPE '\\')";

impl Repository {
    /// One page of students, filtered by name and ordered by a single column.
    pub async fn list_students(
        &self,
        request: &PageRequest<StudentSortField>,
    ) -> Result<Page<Student>, AppError> {
        let pattern = request.filter.as_deref().map(like_pattern);

        let count_sql = format!("SELECT COUNT(*) AS n FROM people WHERE {}", STUDENT_FILTER);
        let total_count: i64 = sqlx::query(&count_sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;

        // id breaks ties so pages never overlap
        let page_sql = format!(
            "SELECT {} FROM people WHERE {} ORDER BY {}, id ASC LIMIT ? OFFSET ?",
            STUDENT_COLUMNS,
            STUDENT_FILTER,
            request.order().order_by_sql()
        );
        let rows = sqlx::query(&page_sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(request.page_size)
            .bind(request.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(student_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(
            items,
            total_count,
            request.page_index,
            request.page_size,
        ))
    }

    /// Get a student by ID.
    pub async fn get_student(&self, id: i64) -> Result<Option<Student>, AppError> {
        let sql = format!(
            "SELECT {} FROM people WHERE id = ? AND role = 'student'",
            STUDENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(student_from_row).transpose()?)
    }

    /// A student together with their enrollments.
    pub async fn student_details(&self, id: i64) -> Result<Option<StudentDetails>, AppError> {
        let Some(student) = self.get_student(id).await? else {
            return Ok(None);
        };
        let enrollments = self.list_enrollments(Some(id), None).await?;

        Ok(Some(StudentDetails {
            full_name: student.name.full_name(),
            student,
            enrollments,
        }))
    }

    /// Create a new student.
    pub async fn create_student(&self, request: &CreateStudentRequest) -> Result<Student, AppError> {
        let name = request.name.trimmed();

        let result = sqlx::query(
            "INSERT INTO people (role, last_name, first_name, enrollment_date, version) VALUES ('student', ?, ?, ?, 1)",
        )
        .bind(&name.last_name)
        .bind(&name.first_mid_name)
        .bind(request.enrollment_date)
        .execute(&self.pool)
        .await?;

        let student = Student {
            id: result.last_insert_rowid(),
            name,
            enrollment_date: request.enrollment_date,
            version: 1,
        };
        tracing::info!(student_id = student.id, "Created student");
        Ok(student)
    }

    /// Update a student with optimistic concurrency control.
    pub async fn update_student(
        &self,
        id: i64,
        request: &UpdateStudentRequest,
    ) -> Result<Student, AppError> {
        let existing = self
            .get_student(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))?;

        check_expected_version(
            &format!("Student {}", id),
            request.expected_version,
            existing.version,
        )?;

        let mut updated = request.apply_to(&existing)?;
        updated.version = existing.version + 1;

        // Conditional UPDATE guards against writers between read and write
        let result = sqlx::query(
            "UPDATE people SET last_name = ?, first_name = ?, enrollment_date = ?, version = ? WHERE id = ? AND role = 'student' AND version = ?",
        )
        .bind(&updated.name.last_name)
        .bind(&updated.name.first_mid_name)
        .bind(updated.enrollment_date)
        .bind(updated.version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_student(id).await?;
            return Err(AppError::update_conflict(
                "Concurrent modification detected",
                current.map(|s| s.version).unwrap_or(0),
            ));
        }

        Ok(updated)
    }

    /// Delete a student and their enrollments.
    pub async fn delete_student(&self, id: i64, expected_version: Option<i64>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query("SELECT version FROM people WHERE id = ? AND role = 'student'")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.try_get("version"))
                .transpose()?;

        let current =
            current.ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))?;
        check_delete_version(&format!("Student {}", id), expected_version, current)?;

        let removed = sqlx::query("DELETE FROM enrollments WHERE student_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let result = sqlx::query("DELETE FROM people WHERE id = ? AND role = 'student' AND version = ?")
            .bind(id)
            .bind(current)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::delete_conflict(
                "Delete failed: the student was modified by another user",
                current,
            ));
        }

        tx.commit().await?;
        tracing::info!(student_id = id, enrollments_removed = removed, "Deleted student");
        Ok(())
    }

    /// Student counts grouped by enrollment date.
    pub async fn enrollment_date_groups(&self) -> Result<Vec<EnrollmentDateGroup>, AppError> {
        let rows = sqlx::query(
            "SELECT enrollment_date, COUNT(*) AS student_count FROM people WHERE role = 'student' GROUP BY enrollment_date ORDER BY enrollment_date",
        )
        .fetch_all(&self.pool)
        .await?;

        let groups = rows
            .iter()
            .map(|row| -> Result<EnrollmentDateGroup, sqlx::Error> {
                Ok(EnrollmentDateGroup {
                    enrollment_date: row.try_get("enrollment_date")?,
                    student_count: row.try_get("student_count")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }
}

fn student_from_row(row: &SqliteRow) -> Result<Student, sqlx::Error> {
    Ok(Student {
        id: row.try_get("id")?,
        name: PersonName::new(
            row.try_get::<String, _>("last_name")?,
            row.try_get::<String, _>("first_name")?,
        ),
        enrollment_date: row.try_get("enrollment_date")?,
        version: row.try_get("version")?,
    })
}
