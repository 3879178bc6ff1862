//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Operations
//! touching more than one table open a transaction that acts as the unit of
//! work for the request; entity operations live in sibling modules as
//! additional `impl Repository` blocks.

use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::PersonRole;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Fail with a conflict when the caller loaded an older version than stored.
pub(super) fn check_expected_version(
    what: &str,
    expected: Option<i64>,
    current: i64,
) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => Err(AppError::update_conflict(
            format!(
                "{}: version mismatch, expected {}, current {}",
                what, expected, current
            ),
            current,
        )),
        _ => Ok(()),
    }
}

/// Delete flavour of [`check_expected_version`].
pub(super) fn check_delete_version(
    what: &str,
    expected: Option<i64>,
    current: i64,
) -> Result<(), AppError> {
    check_expected_version(what, expected, current).map_err(|err| match err {
        AppError::Conflict {
            current_version, ..
        } => AppError::delete_conflict(
            format!(
                "Delete failed: {} was modified by another user. Review the record and try again",
                what
            ),
            current_version,
        ),
        other => other,
    })
}

/// `LIKE` pattern matching `needle` anywhere, with wildcards escaped.
pub(super) fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(super) async fn person_exists(
    conn: &mut SqliteConnection,
    role: PersonRole,
    id: i64,
) -> Result<bool, AppError> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM people WHERE id = ? AND role = ?")
        .bind(id)
        .bind(role.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.try_get::<i64, _>("n")? > 0)
}

pub(super) async fn course_exists(
    conn: &mut SqliteConnection,
    course_id: i64,
) -> Result<bool, AppError> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM courses WHERE course_id = ?")
        .bind(course_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.try_get::<i64, _>("n")? > 0)
}

pub(super) async fn department_exists(
    conn: &mut SqliteConnection,
    department_id: i64,
) -> Result<bool, AppError> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM departments WHERE department_id = ?")
        .bind(department_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.try_get::<i64, _>("n")? > 0)
}
