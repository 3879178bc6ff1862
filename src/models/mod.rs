//! Data models for the university records application.
//!
//! Entities keep explicit foreign-key fields; related rows are fetched by id
//! when a view needs them.

mod course;
mod department;
mod enrollment;
mod instructor;
mod person;
mod student;
mod views;

pub use course::*;
pub use department::*;
pub use enrollment::*;
pub use instructor::*;
pub use person::*;
pub use student::*;
pub use views::*;

use serde::{Deserialize, Deserializer};

use crate::errors::AppError;

/// Deserialize a present field as `Some`, so an explicit `null` becomes
/// `Some(None)`. Paired with `#[serde(default)]`, an omitted field stays `None`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Check a required text field against inclusive character bounds.
pub(crate) fn require_text(
    label: &str,
    value: &str,
    min_len: usize,
    max_len: usize,
) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::Validation(format!("{} is required", label)));
    }
    if len < min_len || len > max_len {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {} characters",
            label, min_len, max_len
        )));
    }
    Ok(())
}
