//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all university records.

mod courses;
mod departments;
mod enrollments;
mod instructors;
mod repository;
mod seed;
mod students;

pub use repository::*;
pub use seed::seed_if_empty;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Create the schema if it does not exist yet.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Students and instructors share one table, told apart by `role`.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            role TEXT NOT NULL CHECK (role IN ('student', 'instructor')),
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            enrollment_date TEXT,
            hire_date TEXT,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS office_assignments (
            instructor_id INTEGER PRIMARY KEY REFERENCES people(id) ON DELETE CASCADE,
            location TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            department_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            budget REAL NOT NULL DEFAULT 0,
            start_date TEXT NOT NULL,
            instructor_id INTEGER REFERENCES people(id) ON DELETE SET NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Course numbers are assigned by users, not generated.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            course_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            credits INTEGER NOT NULL DEFAULT 0,
            department_id INTEGER REFERENCES departments(department_id) ON DELETE SET NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_assignments (
            instructor_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            course_id INTEGER NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
            PRIMARY KEY (instructor_id, course_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrollments (
            enrollment_id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            course_id INTEGER NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
            grade TEXT CHECK (grade IS NULL OR grade IN ('A', 'B', 'C', 'D', 'F')),
            version INTEGER NOT NULL DEFAULT 1,
            UNIQUE (student_id, course_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_people_role_last_name ON people(role, last_name);
        CREATE INDEX IF NOT EXISTS idx_people_enrollment_date ON people(enrollment_date);
        CREATE INDEX IF NOT EXISTS idx_courses_department ON courses(department_id);
        CREATE INDEX IF NOT EXISTS idx_departments_instructor ON departments(instructor_id);
        CREATE INDEX IF NOT EXISTS idx_course_assignments_course ON course_assignments(course_id);
        CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
