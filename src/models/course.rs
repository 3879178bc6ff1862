//! Course model.

use serde::{Deserialize, Serialize};

use super::require_text;
use crate::errors::AppError;

pub const CREDITS_MIN: i64 = 0;
pub const CREDITS_MAX: i64 = 5;

/// A course, identified by its user-assigned course number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: i64,
    pub title: String,
    pub credits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Course {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.course_id <= 0 {
            return Err(AppError::Validation(
                "Course number must be a positive number".to_string(),
            ));
        }
        require_text("Title", &self.title, 3, 50)?;
        if !(CREDITS_MIN..=CREDITS_MAX).contains(&self.credits) {
            return Err(AppError::Validation(format!(
                "Credits must be between {} and {}",
                CREDITS_MIN, CREDITS_MAX
            )));
        }
        Ok(())
    }
}

/// Course row of the course list, with its department name resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListItem {
    #[serde(flatten)]
    pub course: Course,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
}

/// Request body for creating a new course.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub course_id: i64,
    pub title: String,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub department_id: Option<i64>,
}

impl CreateCourseRequest {
    pub fn into_course(self) -> Result<Course, AppError> {
        let course = Course {
            course_id: self.course_id,
            title: self.title.trim().to_string(),
            credits: self.credits,
            department_id: self.department_id,
            version: 1,
        };
        course.validate()?;
        Ok(course)
    }
}

/// Request body for updating an existing course.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub credits: Option<i64>,
    /// Omitted keeps the department, `null` detaches the course
    #[serde(default, deserialize_with = "super::double_option")]
    pub department_id: Option<Option<i64>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl UpdateCourseRequest {
    pub fn apply_to(&self, existing: &Course) -> Result<Course, AppError> {
        let course = Course {
            course_id: existing.course_id,
            title: self
                .title
                .as_deref()
                .map(str::trim)
                .unwrap_or(&existing.title)
                .to_string(),
            credits: self.credits.unwrap_or(existing.credits),
            department_id: self.department_id.unwrap_or(existing.department_id),
            version: existing.version,
        };
        course.validate()?;
        Ok(course)
    }
}

/// Request body for the bulk credits maintenance operation.
///
/// The multiplier is kept as raw JSON so that a missing or non-numeric value
/// is reported as invalid input rather than a body rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCreditsRequest {
    #[serde(default)]
    pub multiplier: Option<serde_json::Value>,
}

impl UpdateCreditsRequest {
    pub fn multiplier(&self) -> Result<i64, AppError> {
        let invalid =
            || AppError::InvalidInput("Multiplier can't be null or anything other than a number".to_string());

        match &self.multiplier {
            Some(serde_json::Value::Number(n)) => n.as_i64().ok_or_else(invalid),
            Some(serde_json::Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

/// Result of the bulk credits maintenance operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsUpdateResult {
    pub multiplier: i64,
    pub rows_affected: u64,
}
