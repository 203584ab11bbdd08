//! Shared setup for HTTP-level tests.

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use lms_playback::db;
use lms_playback::router;
use lms_playback::services::signing::HmacUrlSigner;
use lms_playback::services::tickets::{TicketIssuer, TicketPolicy};
use lms_playback::state::AppState;

pub const PASSWORD: &str = "password123";

/// A running app on a fresh database and media directory
pub struct TestApp {
    pub server: TestServer,
    pub media_dir: PathBuf,
    /// Token of the bootstrap super admin (the first registered account)
    pub admin_token: String,
    _temp: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let media_dir = temp.path().join("media");
        std::fs::create_dir_all(&media_dir).unwrap();

        let pool = db::init_db(&temp.path().join("app.db")).unwrap();
        let tickets = TicketIssuer::new(
            Arc::new(HmacUrlSigner::new("integration-secret")),
            "/media",
            TicketPolicy::default(),
        );
        let state = AppState::new(pool, tickets, media_dir.clone(), 24);
        let server = TestServer::new(router::app(state)).unwrap();

        let mut app = Self {
            server,
            media_dir,
            admin_token: String::new(),
            _temp: temp,
        };
        app.admin_token = app.user("root", "student").await;
        app
    }

    /// Register an account and return its session token
    pub async fn user(&self, username: &str, role: &str) -> String {
        self.server
            .post("/auth/register")
            .json(&json!({ "username": username, "password": PASSWORD, "role": role }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
        self.login(username).await
    }

    pub async fn login(&self, username: &str) -> String {
        let response = self
            .server
            .post("/auth/login")
            .json(&json!({ "username": username, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    /// Create a course with one module of `lessons` video lessons and
    /// return (course id, lesson ids). Lesson media is written to disk.
    pub async fn course(&self, token: &str, lessons: usize, status: &str) -> (i64, Vec<i64>) {
        let course: Value = self
            .server
            .post("/courses")
            .authorization_bearer(token)
            .json(&json!({ "title": "Streaming 101" }))
            .await
            .json();
        let course_id = course["id"].as_i64().unwrap();

        let module: Value = self
            .server
            .post(&format!("/courses/{}/modules", course_id))
            .authorization_bearer(token)
            .json(&json!({ "title": "Basics" }))
            .await
            .json();
        let module_id = module["id"].as_i64().unwrap();

        let mut lesson_ids = Vec::new();
        for n in 1..=lessons {
            let key = format!("courses/{}/lesson-{}.mp4", course_id, n);
            self.write_media(&key, format!("video bytes {}", n).as_bytes());
            let lesson: Value = self
                .server
                .post(&format!("/courses/{}/modules/{}/lessons", course_id, module_id))
                .authorization_bearer(token)
                .json(&json!({ "title": format!("Lesson {}", n), "mediaLocator": key }))
                .await
                .json();
            lesson_ids.push(lesson["id"].as_i64().unwrap());
        }

        self.set_status(token, course_id, status).await;
        (course_id, lesson_ids)
    }

    /// Add one more lesson to the course's first module
    pub async fn add_lesson(&self, token: &str, course_id: i64, body: Value) -> i64 {
        let course: Value = self
            .server
            .get(&format!("/courses/{}", course_id))
            .authorization_bearer(token)
            .await
            .json();
        let module_id = course["modules"][0]["id"].as_i64().unwrap();
        let response = self
            .server
            .post(&format!("/courses/{}/modules/{}/lessons", course_id, module_id))
            .authorization_bearer(token)
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }

    pub async fn set_status(&self, token: &str, course_id: i64, status: &str) {
        self.server
            .put(&format!("/courses/{}/status", course_id))
            .authorization_bearer(token)
            .json(&json!({ "status": status }))
            .await
            .assert_status_ok();
    }

    pub async fn enroll(&self, token: &str, course_id: i64) {
        self.server
            .post(&format!("/courses/{}/enroll", course_id))
            .authorization_bearer(token)
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    pub fn write_media(&self, key: &str, bytes: &[u8]) {
        let path = self.media_dir.join(key);
        std::fs::create_dir_all(path.parent().unwrap_or(Path::new("."))).unwrap();
        std::fs::write(path, bytes).unwrap();
    }
}

/// Error code of a JSON error body
pub fn error_code(body: &Value) -> &str {
    body["code"].as_str().unwrap_or_default()
}
