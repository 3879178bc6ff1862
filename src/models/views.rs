//! View models returned by list, detail and form endpoints.

use chrono::NaiveDate;
use serde::Serialize;

use super::{Course, EnrollmentDetail, Instructor, OfficeAssignment, Student};
use crate::paging::Page;

/// Student list page with the sort/filter state needed to render its header.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIndex {
    pub page: Page<Student>,
    pub current_sort: String,
    pub current_filter: Option<String>,
    pub name_sort_param: String,
    pub date_sort_param: String,
}

/// A student with their enrollments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetails {
    #[serde(flatten)]
    pub student: Student,
    pub full_name: String,
    pub enrollments: Vec<EnrollmentDetail>,
}

/// Record shown before deletion, with the message of a failed earlier attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfirmation<T> {
    pub record: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Course reference inside the instructor index.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignedCourse {
    pub course_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
}

/// Instructor row of the instructor index.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorSummary {
    #[serde(flatten)]
    pub instructor: Instructor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_location: Option<String>,
    pub courses: Vec<AssignedCourse>,
}

/// Instructor index: all instructors, then drill-down into one instructor's
/// courses and one course's enrollments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorIndexData {
    pub instructors: Vec<InstructorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_instructor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<AssignedCourse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_course_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollments: Option<Vec<EnrollmentDetail>>,
}

/// Checkbox state of one course on the instructor form.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignedCourseData {
    pub course_id: i64,
    pub title: String,
    pub assigned: bool,
}

/// Everything the instructor edit form needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorForm {
    pub instructor: Instructor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office: Option<OfficeAssignment>,
    pub courses: Vec<AssignedCourseData>,
}

/// Dropdown entry for choosing a course's department.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentOption {
    pub department_id: i64,
    pub name: String,
    pub selected: bool,
}

/// Everything the course edit form needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseForm {
    pub course: Course,
    pub departments: Vec<DepartmentOption>,
}

/// Number of students per enrollment date.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentDateGroup {
    pub enrollment_date: NaiveDate,
    pub student_count: i64,
}
