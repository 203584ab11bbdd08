//! Course catalog storage (courses, course_modules, lessons).
//!
//! Courses are always loaded as a whole tree so entitlement and progress
//! code can work on plain values.

use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{now_timestamp, parse_enum, parse_timestamp};
use crate::domain::{ContentKind, Course, CourseStatus, Identity, Lesson, Module};

/// Fields for a new lesson
#[derive(Debug, Clone)]
pub struct NewLesson<'a> {
    pub title: &'a str,
    pub kind: ContentKind,
    pub media_locator: Option<&'a str>,
    pub is_free_preview: bool,
}

/// Catalog listing entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: i64,
    pub instructor_id: i64,
    pub title: String,
    pub status: CourseStatus,
    pub lesson_count: i64,
}

/// Create a draft course, returns the course ID
pub fn create_course(
    conn: &Connection,
    instructor_id: i64,
    title: &str,
    description: Option<&str>,
) -> Result<i64> {
    let now = now_timestamp();
    conn.execute(
        r#"INSERT INTO courses (instructor_id, title, description, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, 'draft', ?4, ?4)"#,
        params![instructor_id, title, description, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Change a course's lifecycle status. Returns false if the course doesn't exist.
pub fn set_course_status(conn: &Connection, course_id: i64, status: CourseStatus) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE courses SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), course_id],
    )?;
    Ok(changed > 0)
}

/// Append a module at the end of a course, returns the module ID
pub fn add_module(conn: &Connection, course_id: i64, title: &str) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO course_modules (course_id, position, title)
           SELECT ?1, COALESCE(MAX(position) + 1, 0), ?2
           FROM course_modules WHERE course_id = ?1"#,
        params![course_id, title],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append a lesson at the end of a module, returns the lesson ID
pub fn add_lesson(conn: &Connection, module_id: i64, lesson: &NewLesson<'_>) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO lessons (module_id, position, title, content_kind, media_locator, is_free_preview, created_at)
           SELECT ?1, COALESCE(MAX(position) + 1, 0), ?2, ?3, ?4, ?5, ?6
           FROM lessons WHERE module_id = ?1"#,
        params![
            module_id,
            lesson.title,
            lesson.kind.as_str(),
            lesson.media_locator,
            lesson.is_free_preview,
            now_timestamp(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Course that owns a module
pub fn get_module_course_id(conn: &Connection, module_id: i64) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT course_id FROM course_modules WHERE id = ?1",
        params![module_id],
        |row| row.get(0),
    )
    .optional()
}

/// Course that a lesson belongs to (through its module)
pub fn find_course_for_lesson(conn: &Connection, lesson_id: i64) -> Result<Option<i64>> {
    conn.query_row(
        r#"SELECT m.course_id FROM lessons l
           JOIN course_modules m ON l.module_id = m.id
           WHERE l.id = ?1"#,
        params![lesson_id],
        |row| row.get(0),
    )
    .optional()
}

/// Load a course with its ordered module and lesson tree
pub fn get_course_tree(conn: &Connection, course_id: i64) -> Result<Option<Course>> {
    let course = conn
        .query_row(
            r#"SELECT id, instructor_id, title, description, status, created_at
               FROM courses WHERE id = ?1"#,
            params![course_id],
            |row| {
                let status: String = row.get(4)?;
                let created_at: String = row.get(5)?;
                Ok(Course {
                    id: row.get(0)?,
                    instructor_id: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    status: parse_enum(4, &status, CourseStatus::from_str)?,
                    created_at: parse_timestamp(5, &created_at)?,
                    modules: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut course) = course else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, course_id, position, title FROM course_modules WHERE course_id = ?1 ORDER BY position, id",
    )?;
    course.modules = stmt
        .query_map(params![course_id], |row| {
            Ok(Module {
                id: row.get(0)?,
                course_id: row.get(1)?,
                position: row.get(2)?,
                title: row.get(3)?,
                lessons: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        r#"SELECT l.id, l.module_id, l.position, l.title, l.content_kind, l.media_locator, l.is_free_preview
           FROM lessons l
           JOIN course_modules m ON l.module_id = m.id
           WHERE m.course_id = ?1
           ORDER BY l.position, l.id"#,
    )?;
    let lessons = stmt
        .query_map(params![course_id], |row| {
            let kind: String = row.get(4)?;
            Ok(Lesson {
                id: row.get(0)?,
                module_id: row.get(1)?,
                position: row.get(2)?,
                title: row.get(3)?,
                kind: parse_enum(4, &kind, ContentKind::from_str)?,
                media_locator: row.get(5)?,
                is_free_preview: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    for lesson in lessons {
        if let Some(module) = course.modules.iter_mut().find(|m| m.id == lesson.module_id) {
            module.lessons.push(lesson);
        }
    }

    Ok(Some(course))
}

/// Courses visible in the catalog for a requester:
/// published courses for everyone, plus own courses for instructors and everything for admins.
pub fn list_courses(conn: &Connection, requester: Option<&Identity>) -> Result<Vec<CourseSummary>> {
    let (is_admin, user_id) = match requester {
        Some(identity) => (identity.role.is_admin(), identity.user_id),
        None => (false, 0),
    };

    let mut stmt = conn.prepare(
        r#"SELECT c.id, c.instructor_id, c.title, c.status,
                  (SELECT COUNT(*) FROM lessons l
                   JOIN course_modules m ON l.module_id = m.id
                   WHERE m.course_id = c.id)
           FROM courses c
           WHERE c.status = 'published' OR ?1 = 1 OR c.instructor_id = ?2
           ORDER BY c.created_at DESC, c.id DESC"#,
    )?;
    let courses = stmt
        .query_map(params![is_admin, user_id], |row| {
            let status: String = row.get(3)?;
            Ok(CourseSummary {
                id: row.get(0)?,
                instructor_id: row.get(1)?,
                title: row.get(2)?,
                status: parse_enum(3, &status, CourseStatus::from_str)?,
                lesson_count: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(courses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::testing::TestEnv;

    fn video<'a>(title: &'a str, media: Option<&'a str>) -> NewLesson<'a> {
        NewLesson {
            title,
            kind: ContentKind::Video,
            media_locator: media,
            is_free_preview: false,
        }
    }

    #[test]
    fn test_course_tree_keeps_order() {
        let env = TestEnv::new().unwrap();
        let instructor = env.user("teacher", Role::Instructor);
        let course_id = create_course(&env.conn, instructor, "Rust 101", None).unwrap();

        let m1 = add_module(&env.conn, course_id, "Basics").unwrap();
        let m2 = add_module(&env.conn, course_id, "Ownership").unwrap();
        let l2 = add_lesson(&env.conn, m2, &video("Borrowing", Some("rust/borrow.mp4"))).unwrap();
        let l1 = add_lesson(&env.conn, m1, &video("Hello", Some("rust/hello.mp4"))).unwrap();
        let l1b = add_lesson(&env.conn, m1, &video("Cargo", None)).unwrap();

        let course = get_course_tree(&env.conn, course_id).unwrap().unwrap();
        assert_eq!(course.status, CourseStatus::Draft);
        assert_eq!(course.modules.len(), 2);
        assert_eq!(course.modules[0].id, m1);
        assert_eq!(course.modules[1].position, 1);

        let first: Vec<i64> = course.modules[0].lessons.iter().map(|l| l.id).collect();
        assert_eq!(first, vec![l1, l1b]);
        assert_eq!(course.modules[1].lessons[0].id, l2);
        assert_eq!(course.lesson_count(), 3);
        assert_eq!(course.find_lesson(l1b).unwrap().media_locator, None);
    }

    #[test]
    fn test_missing_course_is_none() {
        let env = TestEnv::new().unwrap();
        assert!(get_course_tree(&env.conn, 404).unwrap().is_none());
    }

    #[test]
    fn test_find_course_for_lesson() {
        let env = TestEnv::new().unwrap();
        let instructor = env.user("teacher", Role::Instructor);
        let course_id = create_course(&env.conn, instructor, "Rust 101", None).unwrap();
        let module = add_module(&env.conn, course_id, "Basics").unwrap();
        let lesson = add_lesson(&env.conn, module, &video("Hello", None)).unwrap();

        assert_eq!(find_course_for_lesson(&env.conn, lesson).unwrap(), Some(course_id));
        assert_eq!(find_course_for_lesson(&env.conn, lesson + 1).unwrap(), None);
        assert_eq!(get_module_course_id(&env.conn, module).unwrap(), Some(course_id));
    }

    #[test]
    fn test_list_courses_visibility() {
        let env = TestEnv::new().unwrap();
        let alice = env.user("alice", Role::Instructor);
        let bob = env.user("bob", Role::Instructor);
        let admin = env.user("root", Role::Admin);

        let published = create_course(&env.conn, alice, "Published", None).unwrap();
        set_course_status(&env.conn, published, CourseStatus::Published).unwrap();
        let _alice_draft = create_course(&env.conn, alice, "Alice draft", None).unwrap();
        let _bob_draft = create_course(&env.conn, bob, "Bob draft", None).unwrap();

        let anonymous = list_courses(&env.conn, None).unwrap();
        assert_eq!(anonymous.len(), 1);
        assert_eq!(anonymous[0].id, published);

        let as_bob = list_courses(&env.conn, Some(&Identity::new(bob, Role::Instructor))).unwrap();
        assert_eq!(as_bob.len(), 2);

        let as_admin = list_courses(&env.conn, Some(&Identity::new(admin, Role::Admin))).unwrap();
        assert_eq!(as_admin.len(), 3);
    }

    #[test]
    fn test_set_status_on_missing_course() {
        let env = TestEnv::new().unwrap();
        assert!(!set_course_status(&env.conn, 99, CourseStatus::Published).unwrap());
    }
}
