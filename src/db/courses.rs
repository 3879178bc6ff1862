//! Course persistence, including the bulk credits maintenance update.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::{
    check_delete_version, check_expected_version, course_exists, department_exists,
};
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Course, CourseForm, CourseListItem, DepartmentOption, UpdateCourseRequest,
};

const COURSE_SELECT: &str = r#"
    SELECT c.course_id, c.title, c.credits, c.department_id, c.version,
           d.name AS department_name
    FROM courses c
    LEFT JOIN departments d ON d.department_id = c.department_id"#;

impl Repository {
    /// List all courses with their department names.
    pub async fn list_courses(&self) -> Result<Vec<CourseListItem>, AppError> {
        let sql = format!("{} ORDER BY c.course_id", COURSE_SELECT);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(course_item_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Get a course (with department name) by its number.
    pub async fn get_course(&self, course_id: i64) -> Result<Option<CourseListItem>, AppError> {
        let sql = format!("{} WHERE c.course_id = ?", COURSE_SELECT);
        let row = sqlx::query(&sql)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(course_item_from_row).transpose()?)
    }

    /// Departments ordered by name, with `selected` marked for the dropdown.
    pub async fn department_options(
        &self,
        selected: Option<i64>,
    ) -> Result<Vec<DepartmentOption>, AppError> {
        let rows = sqlx::query("SELECT department_id, name FROM departments ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let options = rows
            .iter()
            .map(|row| -> Result<DepartmentOption, sqlx::Error> {
                let department_id: i64 = row.try_get("department_id")?;
                Ok(DepartmentOption {
                    department_id,
                    name: row.try_get("name")?,
                    selected: selected == Some(department_id),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(options)
    }

    /// Course plus the department dropdown with its current department selected.
    pub async fn course_form(&self, course_id: i64) -> Result<Option<CourseForm>, AppError> {
        let Some(item) = self.get_course(course_id).await? else {
            return Ok(None);
        };
        let departments = self.department_options(item.course.department_id).await?;

        Ok(Some(CourseForm {
            course: item.course,
            departments,
        }))
    }

    /// Create a new course under a user-assigned number.
    pub async fn create_course(&self, course: &Course) -> Result<CourseListItem, AppError> {
        let mut conn = self.pool.acquire().await?;

        if course_exists(&mut conn, course.course_id).await? {
            return Err(AppError::Validation(format!(
                "Course number {} is already in use",
                course.course_id
            )));
        }
        if let Some(department_id) = course.department_id {
            if !department_exists(&mut conn, department_id).await? {
                return Err(AppError::Validation(format!(
                    "Department {} does not exist",
                    department_id
                )));
            }
        }

        sqlx::query(
            "INSERT INTO courses (course_id, title, credits, department_id, version) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(course.course_id)
        .bind(&course.title)
        .bind(course.credits)
        .bind(course.department_id)
        .execute(&mut *conn)
        .await?;
        drop(conn);

        tracing::info!(course_id = course.course_id, "Created course");
        self.get_course(course.course_id).await?.ok_or_else(|| {
            AppError::Internal(format!("Course {} vanished after insert", course.course_id))
        })
    }

    /// Update a course with optimistic concurrency control.
    pub async fn update_course(
        &self,
        course_id: i64,
        request: &UpdateCourseRequest,
    ) -> Result<CourseListItem, AppError> {
        let existing = self
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))?
            .course;

        check_expected_version(
            &format!("Course {}", course_id),
            request.expected_version,
            existing.version,
        )?;

        let updated = request.apply_to(&existing)?;

        let mut conn = self.pool.acquire().await?;
        if let Some(department_id) = updated.department_id {
            if !department_exists(&mut conn, department_id).await? {
                return Err(AppError::Validation(format!(
                    "Department {} does not exist",
                    department_id
                )));
            }
        }

        let result = sqlx::query(
            "UPDATE courses SET title = ?, credits = ?, department_id = ?, version = ? WHERE course_id = ? AND version = ?",
        )
        .bind(&updated.title)
        .bind(updated.credits)
        .bind(updated.department_id)
        .bind(existing.version + 1)
        .bind(course_id)
        .bind(existing.version)
        .execute(&mut *conn)
        .await?;
        drop(conn);

        if result.rows_affected() == 0 {
            let current = self.get_course(course_id).await?;
            return Err(AppError::update_conflict(
                "Concurrent modification detected",
                current.map(|c| c.course.version).unwrap_or(0),
            ));
        }

        self.get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))
    }

    /// Delete a course with its enrollments and instructor assignments.
    pub async fn delete_course(
        &self,
        course_id: i64,
        expected_version: Option<i64>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current: i64 = sqlx::query("SELECT version FROM courses WHERE course_id = ?")
            .bind(course_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))?
            .try_get("version")?;

        check_delete_version(&format!("Course {}", course_id), expected_version, current)?;

        sqlx::query("DELETE FROM enrollments WHERE course_id = ?")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM course_assignments WHERE course_id = ?")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM courses WHERE course_id = ? AND version = ?")
            .bind(course_id)
            .bind(current)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::delete_conflict(
                "Delete failed: the course was modified by another user",
                current,
            ));
        }

        tx.commit().await?;
        tracing::info!(course_id, "Deleted course");
        Ok(())
    }

    /// Multiply the credits of every course, returning the affected row count.
    ///
    /// Rejected as a whole when any product would leave the integer range.
    pub async fn multiply_course_credits(&self, multiplier: i64) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let credits = sqlx::query("SELECT credits FROM courses")
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.try_get::<i64, _>("credits"))
            .collect::<Result<Vec<_>, _>>()?;

        if credits.iter().any(|c| c.checked_mul(multiplier).is_none()) {
            return Err(AppError::InvalidInput(format!(
                "Multiplier {} would overflow course credits",
                multiplier
            )));
        }

        let result = sqlx::query("UPDATE courses SET credits = credits * ?, version = version + 1")
            .bind(multiplier)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let rows_affected = result.rows_affected();
        tracing::info!(multiplier, rows_affected, "Multiplied course credits");
        Ok(rows_affected)
    }
}

fn course_item_from_row(row: &SqliteRow) -> Result<CourseListItem, sqlx::Error> {
    Ok(CourseListItem {
        course: Course {
            course_id: row.try_get("course_id")?,
            title: row.try_get("title")?,
            credits: row.try_get("credits")?,
            department_id: row.try_get("department_id")?,
            version: row.try_get("version")?,
        },
        department_name: row.try_get("department_name")?,
    })
}
