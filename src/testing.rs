//! Test utilities for database setup.
//!
//! Reuses the authoritative schema initialization so tests never carry
//! their own copy of the schema.

use rusqlite::Connection;
use std::cell::Cell;
use std::path::Path;
use tempfile::TempDir;

use crate::auth::db as auth_db;
use crate::db::{self, courses};
use crate::domain::{ContentKind, Course, CourseStatus, Role};

/// Test environment with a migrated app.db in a temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    /// app.db connection with the full schema
    pub conn: Connection,
    courses_created: Cell<u32>,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("app.db"))?;
        db::configure(&conn)?;
        db::run_migrations(&conn)?;

        Ok(Self {
            temp,
            conn,
            courses_created: Cell::new(0),
        })
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Create a user with the given role, returns the user ID
    pub fn user(&self, username: &str, role: Role) -> i64 {
        auth_db::create_user(&self.conn, username, "not-a-real-hash", role)
            .expect("create test user")
    }

    /// Create a course owned by a fresh instructor, with `lesson_count` video
    /// lessons in a single module, and return its loaded tree
    pub fn course(&self, status: CourseStatus, lesson_count: usize) -> Course {
        let n = self.courses_created.get() + 1;
        self.courses_created.set(n);

        let instructor = self.user(&format!("instructor_{}", n), Role::Instructor);
        self.course_owned_by(instructor, status, lesson_count)
    }

    pub fn published_course(&self, lesson_count: usize) -> Course {
        self.course(CourseStatus::Published, lesson_count)
    }

    pub fn course_owned_by(&self, instructor: i64, status: CourseStatus, lesson_count: usize) -> Course {
        let course_id = courses::create_course(&self.conn, instructor, "Test course", None)
            .expect("create test course");
        if lesson_count > 0 {
            let module = courses::add_module(&self.conn, course_id, "Module 1").expect("add module");
            for i in 0..lesson_count {
                let media = format!("courses/{}/lesson-{}.mp4", course_id, i + 1);
                courses::add_lesson(
                    &self.conn,
                    module,
                    &courses::NewLesson {
                        title: &format!("Lesson {}", i + 1),
                        kind: ContentKind::Video,
                        media_locator: Some(&media),
                        is_free_preview: false,
                    },
                )
                .expect("add lesson");
            }
        }
        courses::set_course_status(&self.conn, course_id, status).expect("set status");
        courses::get_course_tree(&self.conn, course_id)
            .expect("load course")
            .expect("course exists")
    }
}
