//! Lesson completion ledger.
//!
//! One row per (student, lesson). Rows are only ever flipped by
//! [`toggle_completion`]; all percentages are derived from these rows at
//! read time (see `services::progress`).

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now_timestamp, parse_optional_timestamp};
use crate::domain::LessonProgress;

fn progress_from_row(row: &Row<'_>) -> Result<LessonProgress> {
    Ok(LessonProgress {
        student_id: row.get(0)?,
        lesson_id: row.get(1)?,
        is_completed: row.get(2)?,
        completed_at: parse_optional_timestamp(3, row.get(3)?)?,
    })
}

/// Flip the completion flag for (student, lesson) and return the new value.
///
/// A single upsert statement, so concurrent toggles of the same pair each
/// land on a defined state instead of racing a read-then-write. A missing
/// row counts as "not completed", so the first toggle completes the lesson.
/// `completed_at` is set on transition to completed and cleared otherwise.
pub fn toggle_completion(conn: &Connection, student_id: i64, lesson_id: i64) -> Result<bool> {
    let now = now_timestamp();
    conn.query_row(
        r#"INSERT INTO lesson_progress (student_id, lesson_id, is_completed, completed_at, updated_at)
           VALUES (?1, ?2, 1, ?3, ?3)
           ON CONFLICT(student_id, lesson_id) DO UPDATE SET
               is_completed = 1 - lesson_progress.is_completed,
               completed_at = CASE WHEN lesson_progress.is_completed = 0 THEN excluded.completed_at ELSE NULL END,
               updated_at = excluded.updated_at
           RETURNING is_completed"#,
        params![student_id, lesson_id, now],
        |row| row.get(0),
    )
}

/// Progress row for one (student, lesson) pair, if it was ever toggled
pub fn get_lesson_progress(
    conn: &Connection,
    student_id: i64,
    lesson_id: i64,
) -> Result<Option<LessonProgress>> {
    conn.query_row(
        r#"SELECT student_id, lesson_id, is_completed, completed_at
           FROM lesson_progress WHERE student_id = ?1 AND lesson_id = ?2"#,
        params![student_id, lesson_id],
        progress_from_row,
    )
    .optional()
}

/// All progress rows of a student for lessons currently in a course
pub fn list_course_progress(
    conn: &Connection,
    student_id: i64,
    course_id: i64,
) -> Result<Vec<LessonProgress>> {
    let mut stmt = conn.prepare(
        r#"SELECT lp.student_id, lp.lesson_id, lp.is_completed, lp.completed_at
           FROM lesson_progress lp
           JOIN lessons l ON lp.lesson_id = l.id
           JOIN course_modules m ON l.module_id = m.id
           WHERE lp.student_id = ?1 AND m.course_id = ?2"#,
    )?;
    let rows = stmt
        .query_map(params![student_id, course_id], progress_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}
