//! Instructor persistence: offices and course assignments.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::repository::{check_delete_version, check_expected_version, course_exists};
use super::Repository;
use crate::associations::{sync, AssociationDelta};
use crate::errors::AppError;
use crate::models::{
    office_location, AssignedCourse, AssignedCourseData, CreateInstructorRequest, Instructor,
    InstructorForm, InstructorIndexData, InstructorSummary, OfficeAssignment, PersonName,
    UpdateInstructorRequest, UpdateOfficeRequest,
};

const INSTRUCTOR_COLUMNS: &str = "id, last_name, first_name, hire_date, version";

impl Repository {
    /// All instructors ordered by name.
    pub async fn list_instructors(&self) -> Result<Vec<Instructor>, AppError> {
        let sql = format!(
            "SELECT {} FROM people WHERE role = 'instructor' ORDER BY last_name, first_name, id",
            INSTRUCTOR_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(instructor_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Get an instructor by ID.
    pub async fn get_instructor(&self, id: i64) -> Result<Option<Instructor>, AppError> {
        let sql = format!(
            "SELECT {} FROM people WHERE id = ? AND role = 'instructor'",
            INSTRUCTOR_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(instructor_from_row).transpose()?)
    }

    /// Get the office held by an instructor.
    pub async fn get_office(&self, instructor_id: i64) -> Result<Option<OfficeAssignment>, AppError> {
        let row = sqlx::query(
            "SELECT instructor_id, location, version FROM office_assignments WHERE instructor_id = ?",
        )
        .bind(instructor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(office_from_row).transpose()?)
    }

    /// Instructor list with the optional drill-down into one instructor's
    /// courses and one course's enrollments.
    pub async fn instructor_index(
        &self,
        instructor_id: Option<i64>,
        course_id: Option<i64>,
    ) -> Result<InstructorIndexData, AppError> {
        let instructors = self.instructor_summaries().await?;

        let courses = match instructor_id {
            Some(id) => {
                let selected = instructors
                    .iter()
                    .find(|summary| summary.instructor.id == id)
                    .ok_or_else(|| AppError::NotFound(format!("Instructor {} not found", id)))?;
                Some(selected.courses.clone())
            }
            None => None,
        };

        // A selected course must belong to the selected instructor
        let enrollments = match (course_id, &courses) {
            (Some(id), Some(taught)) => {
                if !taught.iter().any(|course| course.course_id == id) {
                    return Err(AppError::NotFound(format!(
                        "Course {} is not taught by the selected instructor",
                        id
                    )));
                }
                Some(self.list_enrollments(None, Some(id)).await?)
            }
            (Some(id), None) => {
                let mut conn = self.pool.acquire().await?;
                if !course_exists(&mut conn, id).await? {
                    return Err(AppError::NotFound(format!("Course {} not found", id)));
                }
                drop(conn);
                Some(self.list_enrollments(None, Some(id)).await?)
            }
            (None, _) => None,
        };

        Ok(InstructorIndexData {
            instructors,
            selected_instructor_id: instructor_id,
            courses,
            selected_course_id: course_id,
            enrollments,
        })
    }

    /// One instructor with office and assigned courses.
    pub async fn instructor_summary(&self, id: i64) -> Result<Option<InstructorSummary>, AppError> {
        let Some(instructor) = self.get_instructor(id).await? else {
            return Ok(None);
        };
        let office_location = self.get_office(id).await?.map(|office| office.location);
        let courses = self
            .assigned_courses()
            .await?
            .remove(&id)
            .unwrap_or_default();

        Ok(Some(InstructorSummary {
            instructor,
            office_location,
            courses,
        }))
    }

    /// Every course with `assigned` set for those the instructor teaches.
    pub async fn assigned_course_data(
        &self,
        instructor_id: Option<i64>,
    ) -> Result<Vec<AssignedCourseData>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT c.course_id, c.title,
                   EXISTS (
                       SELECT 1 FROM course_assignments a
                       WHERE a.course_id = c.course_id AND a.instructor_id = ?
                   ) AS assigned
            FROM courses c
            ORDER BY c.course_id
            "#,
        )
        .bind(instructor_id)
        .fetch_all(&self.pool)
        .await?;

        let courses = rows
            .iter()
            .map(|row| -> Result<AssignedCourseData, sqlx::Error> {
                Ok(AssignedCourseData {
                    course_id: row.try_get("course_id")?,
                    title: row.try_get("title")?,
                    assigned: row.try_get::<i64, _>("assigned")? != 0,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(courses)
    }

    /// Instructor, office and course checkboxes for the edit form.
    pub async fn instructor_form(&self, id: i64) -> Result<Option<InstructorForm>, AppError> {
        let Some(instructor) = self.get_instructor(id).await? else {
            return Ok(None);
        };
        let office = self.get_office(id).await?;
        let courses = self.assigned_course_data(Some(id)).await?;

        Ok(Some(InstructorForm {
            instructor,
            office,
            courses,
        }))
    }

    /// Create an instructor with optional office and course assignments.
    pub async fn create_instructor(
        &self,
        request: &CreateInstructorRequest,
    ) -> Result<InstructorForm, AppError> {
        request.name.validate()?;
        let name = request.name.trimmed();
        let location = office_location(request.office_location.as_deref())?;

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO people (role, last_name, first_name, hire_date, version) VALUES ('instructor', ?, ?, ?, 1)",
        )
        .bind(&name.last_name)
        .bind(&name.first_mid_name)
        .bind(request.hire_date)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        if let Some(location) = &location {
            sqlx::query(
                "INSERT INTO office_assignments (instructor_id, location, version) VALUES (?, ?, 1)",
            )
            .bind(id)
            .bind(location)
            .execute(&mut *tx)
            .await?;
        }

        let known = known_course_ids(&mut tx).await?;
        let selected = known_selection(id, request.selected_courses.as_deref(), &known);
        let delta = sync(id, &BTreeSet::new(), selected.as_ref());
        apply_course_delta(&mut tx, &delta).await?;

        tx.commit().await?;
        tracing::info!(
            instructor_id = id,
            courses = delta.to_add.len(),
            "Created instructor"
        );

        self.instructor_form(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Instructor {} vanished after insert", id)))
    }

    /// Update an instructor, their office and the set of courses they teach.
    pub async fn update_instructor(
        &self,
        id: i64,
        request: &UpdateInstructorRequest,
    ) -> Result<InstructorForm, AppError> {
        let existing = self
            .get_instructor(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Instructor {} not found", id)))?;

        check_expected_version(
            &format!("Instructor {}", id),
            request.expected_version,
            existing.version,
        )?;

        let updated = request.apply_to(&existing)?;
        // None keeps the office, Some(None) removes it
        let office_change = request
            .office_location
            .as_deref()
            .map(|raw| office_location(Some(raw)))
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE people SET last_name = ?, first_name = ?, hire_date = ?, version = ? WHERE id = ? AND role = 'instructor' AND version = ?",
        )
        .bind(&updated.name.last_name)
        .bind(&updated.name.first_mid_name)
        .bind(updated.hire_date)
        .bind(existing.version + 1)
        .bind(id)
        .bind(existing.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i64> = sqlx::query("SELECT version FROM people WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.try_get("version"))
                .transpose()?;
            return Err(AppError::update_conflict(
                "Concurrent modification detected",
                current.unwrap_or(0),
            ));
        }

        match office_change {
            Some(Some(location)) => {
                sqlx::query(
                    r#"
                    INSERT INTO office_assignments (instructor_id, location, version) VALUES (?, ?, 1)
                    ON CONFLICT(instructor_id) DO UPDATE
                    SET location = excluded.location, version = office_assignments.version + 1
                    "#,
                )
                .bind(id)
                .bind(&location)
                .execute(&mut *tx)
                .await?;
            }
            Some(None) => {
                sqlx::query("DELETE FROM office_assignments WHERE instructor_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {}
        }

        let known = known_course_ids(&mut tx).await?;
        let current_courses = instructor_course_ids(&mut tx, id).await?;
        let selected = known_selection(id, request.selected_courses.as_deref(), &known);
        let delta = sync(id, &current_courses, selected.as_ref());
        if !delta.is_empty() {
            apply_course_delta(&mut tx, &delta).await?;
            tracing::debug!(
                instructor_id = id,
                courses = ?delta.apply_to(&current_courses),
                "Synchronised course assignments"
            );
        }

        tx.commit().await?;
        tracing::info!(
            instructor_id = id,
            courses_added = delta.to_add.len(),
            courses_removed = delta.to_remove.len(),
            "Updated instructor"
        );

        self.instructor_form(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Instructor {} not found", id)))
    }

    /// Delete an instructor, detaching them from departments and courses.
    pub async fn delete_instructor(
        &self,
        id: i64,
        expected_version: Option<i64>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current: i64 =
            sqlx::query("SELECT version FROM people WHERE id = ? AND role = 'instructor'")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Instructor {} not found", id)))?
                .try_get("version")?;

        check_delete_version(&format!("Instructor {}", id), expected_version, current)?;

        let departments =
            sqlx::query("UPDATE departments SET instructor_id = NULL WHERE instructor_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        sqlx::query("DELETE FROM course_assignments WHERE instructor_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM office_assignments WHERE instructor_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result =
            sqlx::query("DELETE FROM people WHERE id = ? AND role = 'instructor' AND version = ?")
                .bind(id)
                .bind(current)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::delete_conflict(
                "Delete failed: the instructor was modified by another user",
                current,
            ));
        }

        tx.commit().await?;
        tracing::info!(
            instructor_id = id,
            departments_detached = departments,
            "Deleted instructor"
        );
        Ok(())
    }

    /// Assign or move an instructor's office.
    pub async fn set_office(
        &self,
        instructor_id: i64,
        request: &UpdateOfficeRequest,
    ) -> Result<OfficeAssignment, AppError> {
        if self.get_instructor(instructor_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Instructor {} not found",
                instructor_id
            )));
        }
        let location = office_location(Some(&request.location))?
            .ok_or_else(|| AppError::Validation("Office location is required".to_string()))?;

        match self.get_office(instructor_id).await? {
            Some(existing) => {
                check_expected_version(
                    &format!("Office of instructor {}", instructor_id),
                    request.expected_version,
                    existing.version,
                )?;

                let result = sqlx::query(
                    "UPDATE office_assignments SET location = ?, version = ? WHERE instructor_id = ? AND version = ?",
                )
                .bind(&location)
                .bind(existing.version + 1)
                .bind(instructor_id)
                .bind(existing.version)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    let current = self.get_office(instructor_id).await?;
                    return Err(AppError::update_conflict(
                        "Concurrent modification detected",
                        current.map(|o| o.version).unwrap_or(0),
                    ));
                }

                Ok(OfficeAssignment {
                    instructor_id,
                    location,
                    version: existing.version + 1,
                })
            }
            None => {
                sqlx::query(
                    "INSERT INTO office_assignments (instructor_id, location, version) VALUES (?, ?, 1)",
                )
                .bind(instructor_id)
                .bind(&location)
                .execute(&self.pool)
                .await?;

                Ok(OfficeAssignment {
                    instructor_id,
                    location,
                    version: 1,
                })
            }
        }
    }

    /// Remove an instructor's office.
    pub async fn delete_office(
        &self,
        instructor_id: i64,
        expected_version: Option<i64>,
    ) -> Result<(), AppError> {
        let office = self.get_office(instructor_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Instructor {} has no office", instructor_id))
        })?;

        check_delete_version(
            &format!("Office of instructor {}", instructor_id),
            expected_version,
            office.version,
        )?;

        let result =
            sqlx::query("DELETE FROM office_assignments WHERE instructor_id = ? AND version = ?")
                .bind(instructor_id)
                .bind(office.version)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::delete_conflict(
                "Delete failed: the office was modified by another user",
                office.version,
            ));
        }
        Ok(())
    }

    async fn instructor_summaries(&self) -> Result<Vec<InstructorSummary>, AppError> {
        let instructors = self.list_instructors().await?;

        let rows = sqlx::query("SELECT instructor_id, location FROM office_assignments")
            .fetch_all(&self.pool)
            .await?;
        let mut offices = HashMap::with_capacity(rows.len());
        for row in &rows {
            offices.insert(
                row.try_get::<i64, _>("instructor_id")?,
                row.try_get::<String, _>("location")?,
            );
        }

        let mut courses = self.assigned_courses().await?;

        Ok(instructors
            .into_iter()
            .map(|instructor| InstructorSummary {
                office_location: offices.remove(&instructor.id),
                courses: courses.remove(&instructor.id).unwrap_or_default(),
                instructor,
            })
            .collect())
    }

    /// Assigned courses grouped by instructor.
    async fn assigned_courses(&self) -> Result<BTreeMap<i64, Vec<AssignedCourse>>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT a.instructor_id, c.course_id, c.title, d.name AS department_name
            FROM course_assignments a
            JOIN courses c ON c.course_id = a.course_id
            LEFT JOIN departments d ON d.department_id = c.department_id
            ORDER BY a.instructor_id, c.course_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<i64, Vec<AssignedCourse>> = BTreeMap::new();
        for row in &rows {
            grouped
                .entry(row.try_get("instructor_id")?)
                .or_default()
                .push(AssignedCourse {
                    course_id: row.try_get("course_id")?,
                    title: row.try_get("title")?,
                    department_name: row.try_get("department_name")?,
                });
        }
        Ok(grouped)
    }
}

async fn known_course_ids(conn: &mut SqliteConnection) -> Result<BTreeSet<i64>, AppError> {
    let rows = sqlx::query("SELECT course_id FROM courses")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows
        .iter()
        .map(|row| row.try_get("course_id"))
        .collect::<Result<BTreeSet<i64>, _>>()?)
}

async fn instructor_course_ids(
    conn: &mut SqliteConnection,
    instructor_id: i64,
) -> Result<BTreeSet<i64>, AppError> {
    let rows = sqlx::query("SELECT course_id FROM course_assignments WHERE instructor_id = ?")
        .bind(instructor_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows
        .iter()
        .map(|row| row.try_get("course_id"))
        .collect::<Result<BTreeSet<i64>, _>>()?)
}

async fn apply_course_delta(
    conn: &mut SqliteConnection,
    delta: &AssociationDelta,
) -> Result<(), AppError> {
    for &(instructor_id, course_id) in &delta.to_remove {
        sqlx::query("DELETE FROM course_assignments WHERE instructor_id = ? AND course_id = ?")
            .bind(instructor_id)
            .bind(course_id)
            .execute(&mut *conn)
            .await?;
    }
    for &(instructor_id, course_id) in &delta.to_add {
        sqlx::query("INSERT INTO course_assignments (instructor_id, course_id) VALUES (?, ?)")
            .bind(instructor_id)
            .bind(course_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Restrict a submitted course selection to courses that exist.
fn known_selection(
    instructor_id: i64,
    selected: Option<&[i64]>,
    known: &BTreeSet<i64>,
) -> Option<BTreeSet<i64>> {
    let selected = selected?;
    let (kept, unknown): (BTreeSet<i64>, BTreeSet<i64>) =
        selected.iter().copied().partition(|id| known.contains(id));

    if !unknown.is_empty() {
        tracing::warn!(
            instructor_id,
            unknown = ?unknown,
            "Ignoring selected courses that do not exist"
        );
    }
    Some(kept)
}

fn instructor_from_row(row: &SqliteRow) -> Result<Instructor, sqlx::Error> {
    Ok(Instructor {
        id: row.try_get("id")?,
        name: PersonName::new(
            row.try_get::<String, _>("last_name")?,
            row.try_get::<String, _>("first_name")?,
        ),
        hire_date: row.try_get("hire_date")?,
        version: row.try_get("version")?,
    })
}

fn office_from_row(row: &SqliteRow) -> Result<OfficeAssignment, sqlx::Error> {
    Ok(OfficeAssignment {
        instructor_id: row.try_get("instructor_id")?,
        location: row.try_get("location")?,
        version: row.try_get("version")?,
    })
}
