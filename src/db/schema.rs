//! Schema for the application database.
//!
//! Version-gated migrations: each one checks the recorded schema version,
//! runs inside a transaction, and records its own version in `db_version`.
//! New databases run every migration once; existing databases only run the
//! ones they have not seen yet.

use rusqlite::{params, Connection, Result};

use super::now_timestamp;

/// Current schema version. Increment when adding a migration.
pub const DB_VERSION: i32 = 3;

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Bootstrap: the version table is needed to read the version
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS db_version (
      version INTEGER PRIMARY KEY,
      applied_at TEXT NOT NULL,
      description TEXT
    );
    "#,
  )?;

  let current_version = get_schema_version(conn)?;
  tracing::debug!("app.db schema version: {}", current_version);

  if current_version < 1 {
    migrate(conn, 1, "Create accounts (users, sessions)", V1_ACCOUNTS)?;
  }
  if current_version < 2 {
    migrate(conn, 2, "Create course catalog (courses, course_modules, lessons)", V2_CATALOG)?;
  }
  if current_version < 3 {
    migrate(conn, 3, "Create enrollments and lesson_progress", V3_PROGRESS)?;
  }

  Ok(())
}

const V1_ACCOUNTS: &str = r#"
  CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'student',
    created_at TEXT NOT NULL,
    last_login_at TEXT
  );

  CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    last_access_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
  );

  CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
  CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
"#;

const V2_CATALOG: &str = r#"
  CREATE TABLE IF NOT EXISTS courses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    instructor_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (instructor_id) REFERENCES users(id)
  );

  CREATE TABLE IF NOT EXISTS course_modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    title TEXT NOT NULL,
    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
  );

  CREATE TABLE IF NOT EXISTS lessons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    title TEXT NOT NULL,
    content_kind TEXT NOT NULL DEFAULT 'video',
    media_locator TEXT,
    is_free_preview INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (module_id) REFERENCES course_modules(id) ON DELETE CASCADE
  );

  CREATE INDEX IF NOT EXISTS idx_courses_instructor ON courses(instructor_id);
  CREATE INDEX IF NOT EXISTS idx_courses_status ON courses(status);
  CREATE INDEX IF NOT EXISTS idx_course_modules_course ON course_modules(course_id, position);
  CREATE INDEX IF NOT EXISTS idx_lessons_module ON lessons(module_id, position);
"#;

// lesson_progress is keyed by (student, lesson), not by enrollment: rows survive a dropped enrollment
const V3_PROGRESS: &str = r#"
  CREATE TABLE IF NOT EXISTS enrollments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL,
    course_id INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    enrolled_at TEXT NOT NULL,
    completed_at TEXT,
    UNIQUE (student_id, course_id),
    FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
  );

  CREATE TABLE IF NOT EXISTS lesson_progress (
    student_id INTEGER NOT NULL,
    lesson_id INTEGER NOT NULL,
    is_completed INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (student_id, lesson_id),
    FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
  );

  CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id);
  CREATE INDEX IF NOT EXISTS idx_lesson_progress_lesson ON lesson_progress(lesson_id);
"#;

/// Run one migration atomically and record its version
fn migrate(conn: &Connection, version: i32, description: &str, sql: &str) -> Result<()> {
  tracing::info!("Running migration v{}→v{}: {}", version - 1, version, description);

  let tx = conn.unchecked_transaction()?;
  tx.execute_batch(sql)?;
  record_version(&tx, version, description)?;
  tx.commit()
}

/// Record a schema version after successful migration
fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
  conn.execute(
    "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
    params![version, now_timestamp(), description],
  )?;
  tracing::info!("Recorded schema version {} - {}", version, description);
  Ok(())
}

/// Get current schema version (0 if no versions recorded)
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
  conn.query_row(
    "SELECT COALESCE(MAX(version), 0) FROM db_version",
    [],
    |row| row.get(0),
  )
}
