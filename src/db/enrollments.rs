//! Enrollment persistence.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::repository::{
    check_delete_version, check_expected_version, course_exists, person_exists,
};
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    CreateEnrollmentRequest, Enrollment, EnrollmentDetail, Grade, PersonName, PersonRole,
    UpdateEnrollmentRequest,
};

const DETAIL_SELECT: &str = r#"
    SELECT e.enrollment_id, e.student_id, e.course_id, e.grade, e.version,
           p.last_name, p.first_name, c.title
    FROM enrollments e
    JOIN people p ON p.id = e.student_id
    JOIN courses c ON c.course_id = e.course_id"#;

impl Repository {
    /// Enrollments, optionally restricted to one student and/or one course.
    pub async fn list_enrollments(
        &self,
        student_id: Option<i64>,
        course_id: Option<i64>,
    ) -> Result<Vec<EnrollmentDetail>, AppError> {
        let sql = format!(
            "{} WHERE (? IS NULL OR e.student_id = ?) AND (? IS NULL OR e.course_id = ?) ORDER BY p.last_name, p.first_name, e.course_id",
            DETAIL_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(student_id)
            .bind(student_id)
            .bind(course_id)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(enrollment_detail_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Get an enrollment by ID.
    pub async fn get_enrollment(&self, id: i64) -> Result<Option<EnrollmentDetail>, AppError> {
        let sql = format!("{} WHERE e.enrollment_id = ?", DETAIL_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(enrollment_detail_from_row).transpose()?)
    }

    /// Enroll a student in a course.
    pub async fn create_enrollment(
        &self,
        request: &CreateEnrollmentRequest,
    ) -> Result<EnrollmentDetail, AppError> {
        let mut conn = self.pool.acquire().await?;

        if !person_exists(&mut conn, PersonRole::Student, request.student_id).await? {
            return Err(AppError::Validation(format!(
                "Student {} does not exist",
                request.student_id
            )));
        }
        if !course_exists(&mut conn, request.course_id).await? {
            return Err(AppError::Validation(format!(
                "Course {} does not exist",
                request.course_id
            )));
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO enrollments (student_id, course_id, grade, version) VALUES (?, ?, ?, 1)",
        )
        .bind(request.student_id)
        .bind(request.course_id)
        .bind(request.grade.map(|g| g.as_str()))
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Validation(format!(
                "Student {} is already enrolled in course {}",
                request.student_id, request.course_id
            )));
        }

        let id = result.last_insert_rowid();
        drop(conn);

        self.get_enrollment(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Enrollment {} vanished after insert", id)))
    }

    /// Set or clear the grade of an enrollment.
    pub async fn update_enrollment(
        &self,
        id: i64,
        request: &UpdateEnrollmentRequest,
    ) -> Result<EnrollmentDetail, AppError> {
        let existing = self
            .get_enrollment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Enrollment {} not found", id)))?;
        let current_version = existing.enrollment.version;

        check_expected_version(
            &format!("Enrollment {}", id),
            request.expected_version,
            current_version,
        )?;

        let result = sqlx::query(
            "UPDATE enrollments SET grade = ?, version = ? WHERE enrollment_id = ? AND version = ?",
        )
        .bind(request.grade.map(|g| g.as_str()))
        .bind(current_version + 1)
        .bind(id)
        .bind(current_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_enrollment(id).await?;
            return Err(AppError::update_conflict(
                "Concurrent modification detected",
                current.map(|e| e.enrollment.version).unwrap_or(0),
            ));
        }

        let mut updated = existing;
        updated.enrollment.grade = request.grade;
        updated.enrollment.version = current_version + 1;
        Ok(updated)
    }

    /// Delete an enrollment.
    pub async fn delete_enrollment(
        &self,
        id: i64,
        expected_version: Option<i64>,
    ) -> Result<(), AppError> {
        let existing = self
            .get_enrollment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Enrollment {} not found", id)))?;
        let current_version = existing.enrollment.version;

        check_delete_version(
            &format!("Enrollment {}", id),
            expected_version,
            current_version,
        )?;

        let result = sqlx::query("DELETE FROM enrollments WHERE enrollment_id = ? AND version = ?")
            .bind(id)
            .bind(current_version)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::delete_conflict(
                "Delete failed: the enrollment was modified by another user",
                current_version,
            ));
        }
        Ok(())
    }
}

fn enrollment_detail_from_row(row: &SqliteRow) -> Result<EnrollmentDetail, sqlx::Error> {
    let grade: Option<String> = row.try_get("grade")?;
    let student = PersonName::new(
        row.try_get::<String, _>("last_name")?,
        row.try_get::<String, _>("first_name")?,
    );

    Ok(EnrollmentDetail {
        enrollment: Enrollment {
            enrollment_id: row.try_get("enrollment_id")?,
            student_id: row.try_get("student_id")?,
            course_id: row.try_get("course_id")?,
            grade: grade.as_deref().and_then(Grade::parse),
            version: row.try_get("version")?,
        },
        student_name: student.full_name(),
        course_title: row.try_get("title")?,
    })
}
