//! Integration tests for the university backend.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::{Config, DEFAULT_PAGE_SIZE};
use crate::db::{init_database, seed_if_empty, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

async fn test_state(temp_dir: &TempDir, maintenance_key: Option<&str>, seed: bool) -> AppState {
    let db_path = temp_dir.path().join("test.sqlite");

    let pool = init_database(&db_path).await.expect("Failed to init DB");
    if seed {
        seed_if_empty(&pool).await.expect("Failed to seed DB");
    }

    let config = Config {
        maintenance_key: maintenance_key.map(str::to_string),
        db_path,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        log_json: false,
        page_size: DEFAULT_PAGE_SIZE,
        seed,
    };

    AppState {
        repo: Arc::new(Repository::new(pool)),
        config: Arc::new(config),
    }
}

impl TestFixture {
    /// Empty database, no maintenance key.
    async fn new() -> Self {
        Self::with_options(None, false).await
    }

    /// Database holding the sample university.
    async fn seeded() -> Self {
        Self::with_options(None, true).await
    }

    async fn with_options(maintenance_key: Option<&str>, seed: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state = test_state(&temp_dir, maintenance_key, seed).await;
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (u16, Value) {
        let resp = self.client.delete(self.url(path)).send().await.unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    /// Id of the seeded instructor with the given last name.
    async fn instructor_id(&self, last_name: &str) -> i64 {
        let (_, body) = self.get("/instructors").await;
        body["data"]["instructors"]
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["lastName"] == last_name)
            .and_then(|i| i["id"].as_i64())
            .unwrap()
    }

    /// Id of the seeded department with the given name.
    async fn department_id(&self, name: &str) -> i64 {
        let (_, body) = self.get("/departments").await;
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["name"] == name)
            .and_then(|d| d["departmentId"].as_i64())
            .unwrap()
    }
}

fn last_names(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["lastName"].as_str().unwrap().to_string())
        .collect()
}

fn assigned_courses(form: &Value) -> Vec<i64> {
    form["courses"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["assigned"] == true)
        .map(|c| c["courseId"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(format!("{}/health", fixture.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_student_list_default_page() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/students").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    let index = &body["data"];
    assert_eq!(
        last_names(&index["page"]),
        vec!["Alexander", "Alonso", "Anand"]
    );
    assert_eq!(index["page"]["totalCount"], 8);
    assert_eq!(index["page"]["totalPages"], 3);
    assert_eq!(index["page"]["hasPrevious"], false);
    assert_eq!(index["page"]["hasNext"], true);
    assert_eq!(index["currentSort"], "");
    assert_eq!(index["nameSortParam"], "LastName_desc");
    assert_eq!(index["dateSortParam"], "EnrollmentDate");
}

#[tokio::test]
async fn test_student_list_last_page() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/students?pageNumber=3").await;
    let page = &body["data"]["page"];
    assert_eq!(last_names(page), vec!["Norman", "Olivetto"]);
    assert_eq!(page["hasNext"], false);
    assert_eq!(page["hasPrevious"], true);

    let (_, body) = fixture.get("/students?pageNumber=9").await;
    let page = &body["data"]["page"];
    assert!(page["items"].as_array().unwrap().is_empty());
    assert_eq!(page["hasNext"], false);
}

#[tokio::test]
async fn test_student_list_sorting() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/students?sortOrder=LastName_desc").await;
    let index = &body["data"];
    assert_eq!(
        last_names(&index["page"]),
        vec!["Olivetto", "Norman", "Li"]
    );
    assert_eq!(index["currentSort"], "LastName_desc");
    assert_eq!(index["nameSortParam"], "");

    let (_, body) = fixture.get("/students?sortOrder=EnrollmentDate").await;
    let index = &body["data"];
    assert_eq!(last_names(&index["page"])[0], "Olivetto");
    assert_eq!(index["dateSortParam"], "EnrollmentDate_desc");

    let (status, body) = fixture.get("/students?sortOrder=Budget").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_student_list_filtering() {
    let fixture = TestFixture::seeded().await;

    // "an" matches Alexander, Anand, Li Yan and Norman
    let (_, body) = fixture.get("/students?searchString=an&pageNumber=2").await;
    let index = &body["data"];
    assert_eq!(index["currentFilter"], "an");
    assert_eq!(index["page"]["pageIndex"], 1);
    assert_eq!(index["page"]["totalCount"], 4);
    assert_eq!(
        last_names(&index["page"]),
        vec!["Alexander", "Anand", "Li"]
    );

    let (_, body) = fixture.get("/students?currentFilter=an&pageNumber=2").await;
    let page = &body["data"]["page"];
    assert_eq!(page["pageIndex"], 2);
    assert_eq!(last_names(page), vec!["Norman"]);

    let (_, body) = fixture.get("/students?searchString=zzz").await;
    let page = &body["data"]["page"];
    assert_eq!(page["totalCount"], 0);
    assert_eq!(page["totalPages"], 0);
}

#[tokio::test]
async fn test_student_crud() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/students",
            json!({
                "lastName": " Turing ",
                "firstMidName": "Alan",
                "enrollmentDate": "2020-09-01"
            }),
        )
        .await;
    assert_eq!(status, 200);
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["lastName"], "Turing");
    assert_eq!(body["data"]["version"], 1);

    let (status, body) = fixture.get(&format!("/students/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["fullName"], "Alan, Turing");
    assert!(body["data"]["enrollments"].as_array().unwrap().is_empty());

    let (status, body) = fixture
        .put(
            &format!("/students/{}", id),
            json!({ "firstMidName": "Alan Mathison", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["firstMidName"], "Alan Mathison");
    assert_eq!(body["data"]["lastName"], "Turing");
    assert_eq!(body["data"]["version"], 2);

    let (status, body) = fixture.get(&format!("/students/{}/delete", id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["record"]["id"], id);
    assert!(body["data"]["errorMessage"].is_null());

    let (status, _) = fixture
        .delete(&format!("/students/{}?expectedVersion=2", id))
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get(&format!("/students/{}", id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_student_delete_removes_enrollments() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/students").await;
    let alexander = body["data"]["page"]["items"][0]["id"].as_i64().unwrap();

    let (_, body) = fixture
        .get(&format!("/enrollments?studentId={}", alexander))
        .await;
    assert_eq!(body["data"]["totalCount"], 3);

    let (status, _) = fixture.delete(&format!("/students/{}", alexander)).await;
    assert_eq!(status, 200);

    let (_, body) = fixture
        .get(&format!("/enrollments?studentId={}", alexander))
        .await;
    assert_eq!(body["data"]["totalCount"], 0);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/students",
            json!({
                "lastName": "Lovelace",
                "firstMidName": "A".repeat(51),
                "enrollmentDate": "2020-09-01"
            }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(
        body["error"]["message"],
        "First name can't be longer than 50 characters"
    );

    let (status, body) = fixture
        .post(
            "/courses",
            json!({ "courseId": 9000, "title": "Quantum", "credits": 9 }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Malformed body is reported inside the envelope
    let (status, body) = fixture.post("/students", json!({ "lastName": 5 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;

    for path in [
        "/students/999",
        "/instructors/999",
        "/instructors/999/edit",
        "/courses/999",
        "/courses/999/edit",
        "/departments/999",
        "/enrollments/999",
    ] {
        let (status, body) = fixture.get(path).await;
        assert_eq!(status, 404, "GET {}", path);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    let (status, _) = fixture.delete("/students/999").await;
    assert_eq!(status, 404);

    let (status, _) = fixture.put("/courses/999", json!({ "title": "Nothing" })).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_update_conflict() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture
        .post(
            "/students",
            json!({
                "lastName": "Hopper",
                "firstMidName": "Grace",
                "enrollmentDate": "2019-09-01"
            }),
        )
        .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = fixture
        .put(
            &format!("/students/{}", id),
            json!({ "lastName": "Hopper-Murray", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);

    // Second writer still holds version 1
    let (status, body) = fixture
        .put(
            &format!("/students/{}", id),
            json!({ "lastName": "Stale", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "CONCURRENCY_CONFLICT");
    assert_eq!(body["error"]["details"]["currentVersion"], 2);
    assert_eq!(body["error"]["details"]["saveChangesError"], false);

    let (_, body) = fixture.get(&format!("/students/{}", id)).await;
    assert_eq!(body["data"]["lastName"], "Hopper-Murray");
}

#[tokio::test]
async fn test_delete_conflict() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture
        .post(
            "/students",
            json!({
                "lastName": "Knuth",
                "firstMidName": "Donald",
                "enrollmentDate": "2018-09-01"
            }),
        )
        .await;
    let id = body["data"]["id"].as_i64().unwrap();
    fixture
        .put(&format!("/students/{}", id), json!({ "firstMidName": "Don" }))
        .await;

    let (status, body) = fixture
        .delete(&format!("/students/{}?expectedVersion=1", id))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["details"]["saveChangesError"], true);

    let (status, body) = fixture
        .get(&format!("/students/{}/delete?saveChangesError=true", id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["record"]["version"], 2);
    assert!(body["data"]["errorMessage"]
        .as_str()
        .unwrap()
        .starts_with("Delete failed"));

    // Student still exists
    let (status, _) = fixture.get(&format!("/students/{}", id)).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_instructor_course_sync() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture
        .post(
            "/instructors",
            json!({
                "lastName": "Hamilton",
                "firstMidName": "Margaret",
                "hireDate": "2010-01-04",
                "officeLocation": "Draper 1",
                "selectedCourses": [1045, 9999]
            }),
        )
        .await;
    assert_eq!(status, 200);
    let form = &body["data"];
    let id = form["instructor"]["id"].as_i64().unwrap();
    assert_eq!(assigned_courses(form), vec![1045]);
    assert_eq!(form["office"]["location"], "Draper 1");
    assert_eq!(form["courses"].as_array().unwrap().len(), 7);

    let (status, body) = fixture
        .put(
            &format!("/instructors/{}", id),
            json!({ "selectedCourses": [2021, 2042], "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(assigned_courses(&body["data"]), vec![2021, 2042]);
    // Office untouched when omitted
    assert_eq!(body["data"]["office"]["location"], "Draper 1");
    assert_eq!(body["data"]["instructor"]["version"], 2);

    // Same selection again changes nothing
    let (_, body) = fixture
        .put(
            &format!("/instructors/{}", id),
            json!({ "selectedCourses": [2042, 2021] }),
        )
        .await;
    assert_eq!(assigned_courses(&body["data"]), vec![2021, 2042]);

    // Omitted selection clears every assignment; blank office removes it
    let (_, body) = fixture
        .put(
            &format!("/instructors/{}", id),
            json!({ "officeLocation": "  " }),
        )
        .await;
    assert!(assigned_courses(&body["data"]).is_empty());
    assert!(body["data"]["office"].is_null());

    let (status, _) = fixture.get(&format!("/instructors/{}/office", id)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_instructor_index_drill_down() {
    let fixture = TestFixture::seeded().await;
    let harui = fixture.instructor_id("Harui").await;

    let (status, body) = fixture
        .get(&format!("/instructors?id={}&courseId=1050", harui))
        .await;
    assert_eq!(status, 200);
    let index = &body["data"];

    let instructors = index["instructors"].as_array().unwrap();
    assert_eq!(instructors.len(), 5);
    assert_eq!(instructors[0]["lastName"], "Abercrombie");

    let courses: Vec<i64> = index["courses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["courseId"].as_i64().unwrap())
        .collect();
    assert_eq!(courses, vec![1050, 3141]);
    assert_eq!(index["courses"][0]["departmentName"], "Engineering");

    let enrollments = index["enrollments"].as_array().unwrap();
    assert_eq!(enrollments.len(), 3);
    assert!(enrollments
        .iter()
        .any(|e| e["studentName"] == "Carson, Alexander" && e["grade"] == "A"));

    let (_, body) = fixture.get("/instructors").await;
    assert!(body["data"]["courses"].is_null());
    assert!(body["data"]["enrollments"].is_null());

    let (status, _) = fixture.get("/instructors?id=999").await;
    assert_eq!(status, 404);

    // The course must be one the selected instructor teaches
    let (status, body) = fixture
        .get(&format!("/instructors?id={}&courseId=1045", harui))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_office_crud() {
    let fixture = TestFixture::seeded().await;
    let zheng = fixture.instructor_id("Zheng").await;

    let (status, _) = fixture.get(&format!("/instructors/{}/office", zheng)).await;
    assert_eq!(status, 404);

    let (status, body) = fixture
        .put(
            &format!("/instructors/{}/office", zheng),
            json!({ "location": "Beck 12" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["version"], 1);

    let (status, body) = fixture
        .put(
            &format!("/instructors/{}/office", zheng),
            json!({ "location": "Beck 14", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["location"], "Beck 14");
    assert_eq!(body["data"]["version"], 2);

    let (status, _) = fixture
        .put(
            &format!("/instructors/{}/office", zheng),
            json!({ "location": "" }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .delete(&format!("/instructors/{}/office?expectedVersion=2", zheng))
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_instructor_delete_detaches_department() {
    let fixture = TestFixture::seeded().await;
    let kapoor = fixture.instructor_id("Kapoor").await;
    let economics = fixture.department_id("Economics").await;

    let (_, body) = fixture.get(&format!("/departments/{}", economics)).await;
    assert_eq!(body["data"]["administratorName"], "Candace, Kapoor");

    let (status, _) = fixture.delete(&format!("/instructors/{}", kapoor)).await;
    assert_eq!(status, 200);

    let (_, body) = fixture.get(&format!("/departments/{}", economics)).await;
    assert!(body["data"]["instructorId"].is_null());
    assert!(body["data"]["administratorName"].is_null());

    // Chemistry keeps its other instructor
    let harui = fixture.instructor_id("Harui").await;
    let (_, body) = fixture.get(&format!("/instructors/{}", harui)).await;
    assert_eq!(body["data"]["courses"][0]["courseId"], 1050);
}

#[tokio::test]
async fn test_course_crud() {
    let fixture = TestFixture::seeded().await;
    let mathematics = fixture.department_id("Mathematics").await;

    let (status, body) = fixture.get("/courses/new").await;
    assert_eq!(status, 200);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Economics", "Engineering", "English", "Mathematics"]);

    let (status, body) = fixture
        .post(
            "/courses",
            json!({
                "courseId": 3180,
                "title": "Statistics",
                "credits": 3,
                "departmentId": mathematics
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["departmentName"], "Mathematics");

    // Course numbers are unique
    let (status, body) = fixture
        .post(
            "/courses",
            json!({ "courseId": 3180, "title": "Statistics II", "credits": 3 }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = fixture.get("/courses/3180/edit").await;
    let selected: Vec<&Value> = body["data"]["departments"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|d| d["selected"] == true)
        .collect();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0]["name"], "Mathematics");

    let (status, body) = fixture
        .put(
            "/courses/3180",
            json!({ "credits": 4, "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["credits"], 4);
    assert_eq!(body["data"]["title"], "Statistics");

    let (_, body) = fixture.get("/courses").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 8);

    let (status, _) = fixture.delete("/courses/1050").await;
    assert_eq!(status, 200);

    let (_, body) = fixture.get("/enrollments?courseId=1050").await;
    assert_eq!(body["data"]["totalCount"], 0);
}

#[tokio::test]
async fn test_course_update_clears_department() {
    let fixture = TestFixture::seeded().await;
    let english = fixture.department_id("English").await;

    // Omitted keeps the department
    let (status, body) = fixture
        .put("/courses/1045", json!({ "title": "Calculus I" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["departmentName"], "Mathematics");

    let (status, body) = fixture
        .put("/courses/1045", json!({ "departmentId": null }))
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["departmentId"].is_null());
    assert!(body["data"]["departmentName"].is_null());
    assert_eq!(body["data"]["title"], "Calculus I");

    let (status, body) = fixture
        .put("/courses/1045", json!({ "departmentId": english }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["departmentName"], "English");
}

#[tokio::test]
async fn test_department_delete_keeps_courses() {
    let fixture = TestFixture::seeded().await;
    let economics = fixture.department_id("Economics").await;

    let (status, _) = fixture
        .delete(&format!("/departments/{}?expectedVersion=1", economics))
        .await;
    assert_eq!(status, 200);

    for course_id in [4022, 4041] {
        let (status, body) = fixture.get(&format!("/courses/{}", course_id)).await;
        assert_eq!(status, 200);
        assert!(body["data"]["departmentId"].is_null());
        assert!(body["data"]["departmentName"].is_null());
    }

    let (_, body) = fixture.get("/departments").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_department_crud() {
    let fixture = TestFixture::seeded().await;
    let zheng = fixture.instructor_id("Zheng").await;

    let (status, body) = fixture
        .post(
            "/departments",
            json!({
                "name": "Philosophy",
                "budget": 50000.0,
                "startDate": "2021-09-01",
                "instructorId": zheng
            }),
        )
        .await;
    assert_eq!(status, 200);
    let id = body["data"]["departmentId"].as_i64().unwrap();
    assert_eq!(body["data"]["administratorName"], "Roger, Zheng");

    let (status, body) = fixture
        .put(
            &format!("/departments/{}", id),
            json!({ "budget": 75000.0, "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["budget"], 75000.0);
    assert_eq!(body["data"]["version"], 2);

    // Students cannot administer departments
    let (_, students) = fixture.get("/students").await;
    let student = students["data"]["page"]["items"][0]["id"].as_i64().unwrap();
    let (status, body) = fixture
        .put(
            &format!("/departments/{}", id),
            json!({ "instructorId": student }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // An explicit null removes the administrator
    let (status, body) = fixture
        .put(&format!("/departments/{}", id), json!({ "instructorId": null }))
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["instructorId"].is_null());
    assert!(body["data"]["administratorName"].is_null());
    assert_eq!(body["data"]["budget"], 75000.0);
}

#[tokio::test]
async fn test_enrollment_crud() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/students?sortOrder=LastName_desc").await;
    let olivetto = body["data"]["page"]["items"][0]["id"].as_i64().unwrap();

    let (status, body) = fixture
        .post(
            "/enrollments",
            json!({ "studentId": olivetto, "courseId": 1045 }),
        )
        .await;
    assert_eq!(status, 200);
    let id = body["data"]["enrollmentId"].as_i64().unwrap();
    assert!(body["data"]["grade"].is_null());
    assert_eq!(body["data"]["courseTitle"], "Calculus");

    let (status, body) = fixture
        .post(
            "/enrollments",
            json!({ "studentId": olivetto, "courseId": 1045 }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .post("/enrollments", json!({ "studentId": olivetto, "courseId": 7777 }))
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .put(
            &format!("/enrollments/{}", id),
            json!({ "grade": "A", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["grade"], "A");

    let (status, _) = fixture
        .put(&format!("/enrollments/{}", id), json!({ "grade": "E" }))
        .await;
    assert_eq!(status, 400);

    let (_, body) = fixture.get("/enrollments?courseId=1045").await;
    assert_eq!(body["data"]["totalCount"], 2);

    let (status, _) = fixture.delete(&format!("/enrollments/{}", id)).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_enrollment_list_paging() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/enrollments?pageNumber=4").await;
    let page = &body["data"];
    assert_eq!(page["totalCount"], 11);
    assert_eq!(page["totalPages"], 4);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["hasNext"], false);
}

#[tokio::test]
async fn test_enrollment_date_stats() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/stats/enrollment-dates").await;
    assert_eq!(status, 200);
    assert_eq!(
        body["data"],
        json!([
            { "enrollmentDate": "2005-09-01", "studentCount": 1 },
            { "enrollmentDate": "2010-09-01", "studentCount": 1 },
            { "enrollmentDate": "2011-09-01", "studentCount": 1 },
            { "enrollmentDate": "2012-09-01", "studentCount": 3 },
            { "enrollmentDate": "2013-09-01", "studentCount": 2 }
        ])
    );
}

#[tokio::test]
async fn test_update_credits() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture
        .post("/courses/credits", json!({ "multiplier": 2 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["rowsAffected"], 7);
    assert_eq!(body["data"]["multiplier"], 2);

    let (_, body) = fixture.get("/courses/1045").await;
    assert_eq!(body["data"]["credits"], 8);
    assert_eq!(body["data"]["version"], 2);

    for bad in [json!({}), json!({ "multiplier": "two" }), json!({ "multiplier": 1.5 })] {
        let (status, body) = fixture.post("/courses/credits", bad).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
    }
}

#[tokio::test]
async fn test_update_credits_rejects_overflow() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture
        .post(
            "/courses/credits",
            json!({ "multiplier": 4_611_686_018_427_387_904_i64 }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    // Nothing was changed and the courses still load
    let (status, body) = fixture.get("/courses").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 7);

    let (_, body) = fixture.get("/courses/1045").await;
    assert_eq!(body["data"]["credits"], 4);
    assert_eq!(body["data"]["version"], 1);

    let (status, body) = fixture
        .post("/courses/credits", json!({ "multiplier": -3 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["rowsAffected"], 7);
    let (_, body) = fixture.get("/courses/1045").await;
    assert_eq!(body["data"]["credits"], -12);
}

#[tokio::test]
async fn test_update_credits_requires_key() {
    let fixture = TestFixture::with_options(Some("maint-secret"), true).await;

    let (status, body) = fixture
        .post("/courses/credits", json!({ "multiplier": 2 }))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = fixture
        .client
        .post(fixture.url("/courses/credits"))
        .header("x-maintenance-key", "maint-secret")
        .json(&json!({ "multiplier": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Ordinary routes stay open
    let (status, _) = fixture.get("/courses").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_maintenance_key_bearer() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(&temp_dir, Some("maint-secret"), false).await;
    let app = create_router(state);

    let request = |auth: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/courses/credits")
            .header("content-type", "application/json")
            .header("authorization", auth)
            .body(Body::from(r#"{"multiplier": 3}"#))
            .unwrap()
    };

    let resp = app
        .clone()
        .oneshot(request("Bearer wrong"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.oneshot(request("Bearer maint-secret")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_seed_runs_once() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("seed.sqlite"))
        .await
        .unwrap();

    assert!(seed_if_empty(&pool).await.unwrap());
    assert!(!seed_if_empty(&pool).await.unwrap());

    let repo = Repository::new(pool);
    assert_eq!(repo.list_instructors().await.unwrap().len(), 5);
    assert_eq!(repo.list_courses().await.unwrap().len(), 7);
    assert_eq!(repo.list_departments().await.unwrap().len(), 4);
    assert_eq!(repo.list_enrollments(None, None).await.unwrap().len(), 11);
}
