//! Student model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PersonName;
use crate::errors::AppError;
use crate::paging::SortField;

/// A student enrolled at the university.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    #[serde(flatten)]
    pub name: PersonName,
    pub enrollment_date: NaiveDate,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Columns the student list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentSortField {
    LastName,
    FirstMidName,
    EnrollmentDate,
}

impl SortField for StudentSortField {
    const DEFAULT: Self = StudentSortField::LastName;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "LastName" => Some(StudentSortField::LastName),
            "FirstMidName" => Some(StudentSortField::FirstMidName),
            "EnrollmentDate" => Some(StudentSortField::EnrollmentDate),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            StudentSortField::LastName => "LastName",
            StudentSortField::FirstMidName => "FirstMidName",
            StudentSortField::EnrollmentDate => "EnrollmentDate",
        }
    }

    fn column(self) -> &'static str {
        match self {
            StudentSortField::LastName => "last_name",
            StudentSortField::FirstMidName => "first_name",
            StudentSortField::EnrollmentDate => "enrollment_date",
        }
    }
}

/// Request body for creating a new student.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(flatten)]
    pub name: PersonName,
    pub enrollment_date: NaiveDate,
}

impl CreateStudentRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        self.name.validate()
    }
}

/// Request body for updating an existing student.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub first_mid_name: Option<String>,
    #[serde(default)]
    pub enrollment_date: Option<NaiveDate>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl UpdateStudentRequest {
    /// Merge the requested changes over `existing` and validate the result.
    pub fn apply_to(&self, existing: &Student) -> Result<Student, AppError> {
        let name = PersonName::new(
            self.last_name
                .clone()
                .unwrap_or_else(|| existing.name.last_name.clone()),
            self.first_mid_name
                .clone()
                .unwrap_or_else(|| existing.name.first_mid_name.clone()),
        );
        name.validate()?;

        Ok(Student {
            id: existing.id,
            name: name.trimmed(),
            enrollment_date: self.enrollment_date.unwrap_or(existing.enrollment_date),
            version: existing.version,
        })
    }
}
