//! Sample university data for empty databases.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

const STUDENTS: &[(&str, &str, &str)] = &[
    ("Alexander", "Carson", "2010-09-01"),
    ("Alonso", "Meredith", "2012-09-01"),
    ("Anand", "Arturo", "2013-09-01"),
    ("Barzdukas", "Gytis", "2012-09-01"),
    ("Li", "Yan", "2012-09-01"),
    ("Justice", "Peggy", "2011-09-01"),
    ("Norman", "Laura", "2013-09-01"),
    ("Olivetto", "Nino", "2005-09-01"),
];

const INSTRUCTORS: &[(&str, &str, &str)] = &[
    ("Abercrombie", "Kim", "1995-03-11"),
    ("Fakhouri", "Fadi", "2002-07-06"),
    ("Harui", "Roger", "1998-07-01"),
    ("Kapoor", "Candace", "2001-01-15"),
    ("Zheng", "Roger", "2004-02-12"),
];

/// (name, budget, administrator last name)
const DEPARTMENTS: &[(&str, f64, &str)] = &[
    ("English", 350000.0, "Abercrombie"),
    ("Mathematics", 100000.0, "Fakhouri"),
    ("Engineering", 350000.0, "Harui"),
    ("Economics", 100000.0, "Kapoor"),
];

const DEPARTMENT_START: &str = "2007-09-01";

/// (course number, title, credits, department)
const COURSES: &[(i64, &str, i64, &str)] = &[
    (1050, "Chemistry", 3, "Engineering"),
    (4022, "Microeconomics", 3, "Economics"),
    (4041, "Macroeconomics", 3, "Economics"),
    (1045, "Calculus", 4, "Mathematics"),
    (3141, "Trigonometry", 4, "Mathematics"),
    (2021, "Composition", 3, "English"),
    (2042, "Literature", 4, "English"),
];

const OFFICES: &[(&str, &str)] = &[
    ("Fakhouri", "Smith 17"),
    ("Harui", "Gowan 27"),
    ("Kapoor", "Thompson 304"),
];

const COURSE_ASSIGNMENTS: &[(i64, &str)] = &[
    (1050, "Kapoor"),
    (1050, "Harui"),
    (4022, "Zheng"),
    (4041, "Zheng"),
    (1045, "Fakhouri"),
    (3141, "Harui"),
    (2021, "Abercrombie"),
    (2042, "Abercrombie"),
];

/// (student last name, course number, grade)
const ENROLLMENTS: &[(&str, i64, Option<&str>)] = &[
    ("Alexander", 1050, Some("A")),
    ("Alexander", 4022, Some("C")),
    ("Alexander", 4041, Some("B")),
    ("Alonso", 1045, Some("B")),
    ("Alonso", 3141, Some("F")),
    ("Alonso", 2021, Some("F")),
    ("Anand", 1050, None),
    ("Anand", 4022, Some("B")),
    ("Barzdukas", 1050, Some("B")),
    ("Li", 2021, Some("B")),
    ("Justice", 2042, Some("B")),
];

fn date(value: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| sqlx::Error::Protocol(format!("invalid seed date {}: {}", value, e)))
}

fn lookup(ids: &HashMap<&str, i64>, key: &str) -> Result<i64, sqlx::Error> {
    ids.get(key)
        .copied()
        .ok_or_else(|| sqlx::Error::Protocol(format!("unknown seed reference {}", key)))
}

/// Insert the sample university when no students exist yet.
///
/// Returns whether anything was written.
pub async fn seed_if_empty(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let students: i64 = sqlx::query("SELECT COUNT(*) AS n FROM people WHERE role = 'student'")
        .fetch_one(pool)
        .await?
        .try_get("n")?;
    if students > 0 {
        tracing::debug!(students, "Database already populated, skipping seed");
        return Ok(false);
    }

    let mut tx = pool.begin().await?;

    let mut student_ids = HashMap::new();
    for &(last, first, enrolled) in STUDENTS {
        let id = sqlx::query(
            "INSERT INTO people (role, last_name, first_name, enrollment_date, version) VALUES ('student', ?, ?, ?, 1)",
        )
        .bind(last)
        .bind(first)
        .bind(date(enrolled)?)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        student_ids.insert(last, id);
    }

    let mut instructor_ids = HashMap::new();
    for &(last, first, hired) in INSTRUCTORS {
        let id = sqlx::query(
            "INSERT INTO people (role, last_name, first_name, hire_date, version) VALUES ('instructor', ?, ?, ?, 1)",
        )
        .bind(last)
        .bind(first)
        .bind(date(hired)?)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        instructor_ids.insert(last, id);
    }

    let start = date(DEPARTMENT_START)?;
    let mut department_ids = HashMap::new();
    for &(name, budget, administrator) in DEPARTMENTS {
        let id = sqlx::query(
            "INSERT INTO departments (name, budget, start_date, instructor_id, version) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(name)
        .bind(budget)
        .bind(start)
        .bind(lookup(&instructor_ids, administrator)?)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        department_ids.insert(name, id);
    }

    for &(course_id, title, credits, department) in COURSES {
        sqlx::query(
            "INSERT INTO courses (course_id, title, credits, department_id, version) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(course_id)
        .bind(title)
        .bind(credits)
        .bind(lookup(&department_ids, department)?)
        .execute(&mut *tx)
        .await?;
    }

    for &(instructor, location) in OFFICES {
        sqlx::query(
            "INSERT INTO office_assignments (instructor_id, location, version) VALUES (?, ?, 1)",
        )
        .bind(lookup(&instructor_ids, instructor)?)
        .bind(location)
        .execute(&mut *tx)
        .await?;
    }

    for &(course_id, instructor) in COURSE_ASSIGNMENTS {
        sqlx::query("INSERT INTO course_assignments (instructor_id, course_id) VALUES (?, ?)")
            .bind(lookup(&instructor_ids, instructor)?)
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
    }

    for &(student, course_id, grade) in ENROLLMENTS {
        sqlx::query(
            "INSERT INTO enrollments (student_id, course_id, grade, version) VALUES (?, ?, ?, 1)",
        )
        .bind(lookup(&student_ids, student)?)
        .bind(course_id)
        .bind(grade)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(
        students = STUDENTS.len(),
        instructors = INSTRUCTORS.len(),
        courses = COURSES.len(),
        enrollments = ENROLLMENTS.len(),
        "Seeded sample university"
    );
    Ok(true)
}
