//! Instructor and office assignment models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PersonName;
use crate::errors::AppError;

pub const OFFICE_LOCATION_MAX_LEN: usize = 50;

/// A member of the teaching staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: i64,
    #[serde(flatten)]
    pub name: PersonName,
    pub hire_date: NaiveDate,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// The office held by an instructor (at most one).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OfficeAssignment {
    pub instructor_id: i64,
    pub location: String,
    #[serde(default)]
    pub version: i64,
}

/// Normalise a submitted office location: blank means "no office".
pub fn office_location(raw: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(location) = raw.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };
    if location.chars().count() > OFFICE_LOCATION_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Office location can't be longer than {} characters",
            OFFICE_LOCATION_MAX_LEN
        )));
    }
    Ok(Some(location.to_string()))
}

/// Request body for creating a new instructor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstructorRequest {
    #[serde(flatten)]
    pub name: PersonName,
    pub hire_date: NaiveDate,
    #[serde(default)]
    pub office_location: Option<String>,
    /// Course numbers the instructor teaches
    #[serde(default)]
    pub selected_courses: Option<Vec<i64>>,
}

/// Request body for updating an existing instructor.
///
/// `officeLocation` omitted keeps the current office, blank removes it.
/// `selectedCourses` is the complete new set of taught courses; omitting it
/// or sending an empty list removes every course assignment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstructorRequest {
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub first_mid_name: Option<String>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub office_location: Option<String>,
    #[serde(default)]
    pub selected_courses: Option<Vec<i64>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl UpdateInstructorRequest {
    /// Merge name and hire date changes over `existing` and validate the result.
    pub fn apply_to(&self, existing: &Instructor) -> Result<Instructor, AppError> {
        let name = PersonName::new(
            self.last_name
                .clone()
                .unwrap_or_else(|| existing.name.last_name.clone()),
            self.first_mid_name
                .clone()
                .unwrap_or_else(|| existing.name.first_mid_name.clone()),
        );
        name.validate()?;

        Ok(Instructor {
            id: existing.id,
            name: name.trimmed(),
            hire_date: self.hire_date.unwrap_or(existing.hire_date),
            version: existing.version,
        })
    }
}

/// Request body for setting an instructor's office.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOfficeRequest {
    pub location: String,
    #[serde(default)]
    pub expected_version: Option<i64>,
}
