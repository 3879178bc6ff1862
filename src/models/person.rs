//! Identity shared by students and instructors.

use serde::{Deserialize, Serialize};

use super::require_text;
use crate::errors::AppError;

pub const NAME_MAX_LEN: usize = 50;

/// Role discriminator stored next to every person row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersonRole {
    Student,
    Instructor,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonRole::Student => "student",
            PersonRole::Instructor => "instructor",
        }
    }
}

/// Name of a person, embedded into [`super::Student`] and [`super::Instructor`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    pub last_name: String,
    pub first_mid_name: String,
}

impl PersonName {
    pub fn new(last_name: impl Into<String>, first_mid_name: impl Into<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_mid_name: first_mid_name.into(),
        }
    }

    /// Display form, first name first: `"Carson, Alexander"` → `"Alexander, Carson"`.
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.first_mid_name, self.last_name)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_text("Last name", &self.last_name, 1, NAME_MAX_LEN)?;
        if self.first_mid_name.trim().is_empty() {
            return Err(AppError::Validation("First name is required".to_string()));
        }
        if self.first_mid_name.trim().chars().count() > NAME_MAX_LEN {
            return Err(AppError::Validation(
                "First name can't be longer than 50 characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy with surrounding whitespace removed.
    pub fn trimmed(&self) -> Self {
        Self::new(self.last_name.trim(), self.first_mid_name.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let name = PersonName::new("Carson", "Alexander");
        assert_eq!(name.full_name(), "Alexander, Carson");
    }

    #[test]
    fn test_validate() {
        assert!(PersonName::new("Li", "Yan").validate().is_ok());
        assert!(PersonName::new("", "Yan").validate().is_err());
        assert!(PersonName::new("Li", " ").validate().is_err());

        let err = PersonName::new("Li", "y".repeat(51)).validate().unwrap_err();
        assert_eq!(
            err.message(),
            "First name can't be longer than 50 characters"
        );
    }

    #[test]
    fn test_role_strings() {
        assert_eq!(PersonRole::Student.as_str(), "student");
        assert_eq!(PersonRole::Instructor.as_str(), "instructor");
    }
}
