//! Department model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::require_text;
use crate::errors::AppError;

/// An academic department, optionally administered by an instructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub department_id: i64,
    pub name: String,
    pub budget: f64,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<i64>,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Department {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("Name", &self.name, 3, 50)?;
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(AppError::Validation(
                "Budget must be a non-negative amount".to_string(),
            ));
        }
        Ok(())
    }
}

/// Department row with the administrator's name resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentListItem {
    #[serde(flatten)]
    pub department: Department,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administrator_name: Option<String>,
}

/// Request body for creating a new department.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    pub name: String,
    #[serde(default)]
    pub budget: f64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub instructor_id: Option<i64>,
}

impl CreateDepartmentRequest {
    /// Build an unsaved department; the id is assigned on insert.
    pub fn to_department(&self) -> Result<Department, AppError> {
        let department = Department {
            department_id: 0,
            name: self.name.trim().to_string(),
            budget: self.budget,
            start_date: self.start_date,
            instructor_id: self.instructor_id,
            version: 1,
        };
        department.validate()?;
        Ok(department)
    }
}

/// Request body for updating an existing department.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Omitted keeps the administrator, `null` removes it
    #[serde(default, deserialize_with = "super::double_option")]
    pub instructor_id: Option<Option<i64>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl UpdateDepartmentRequest {
    pub fn apply_to(&self, existing: &Department) -> Result<Department, AppError> {
        let department = Department {
            department_id: existing.department_id,
            name: self
                .name
                .as_deref()
                .map(str::trim)
                .unwrap_or(&existing.name)
                .to_string(),
            budget: self.budget.unwrap_or(existing.budget),
            start_date: self.start_date.unwrap_or(existing.start_date),
            instructor_id: self.instructor_id.unwrap_or(existing.instructor_id),
            version: existing.version,
        };
        department.validate()?;
        Ok(department)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let request: CreateDepartmentRequest = serde_json::from_value(serde_json::json!({
            "name": "Economics",
            "budget": 100000.0,
            "startDate": "2007-09-01"
        }))
        .unwrap();
        let department = request.to_department().unwrap();
        assert_eq!(department.name, "Economics");
        assert!(department.instructor_id.is_none());

        let negative = Department {
            budget: -1.0,
            ..department.clone()
        };
        assert!(negative.validate().is_err());

        let short = Department {
            name: "IT".into(),
            ..department
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_update_administrator_patch() {
        let existing = Department {
            department_id: 1,
            name: "English".into(),
            budget: 350000.0,
            start_date: NaiveDate::from_ymd_opt(2007, 9, 1).unwrap(),
            instructor_id: Some(9),
            version: 1,
        };
        let apply = |v| {
            serde_json::from_value::<UpdateDepartmentRequest>(v)
                .unwrap()
                .apply_to(&existing)
                .unwrap()
                .instructor_id
        };
        assert_eq!(apply(serde_json::json!({ "name": "Literature" })), Some(9));
        assert_eq!(apply(serde_json::json!({ "instructorId": null })), None);
        assert_eq!(apply(serde_json::json!({ "instructorId": 3 })), Some(3));
    }
}
