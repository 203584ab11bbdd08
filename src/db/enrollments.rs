//! Enrollment storage.

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now_timestamp, parse_enum, parse_optional_timestamp, parse_timestamp};
use crate::domain::{Enrollment, EnrollmentStatus};

const ENROLLMENT_COLUMNS: &str =
    "id, student_id, course_id, status, enrolled_at, completed_at";

fn enrollment_from_row(row: &Row<'_>) -> Result<Enrollment> {
    let status: String = row.get(3)?;
    let enrolled_at: String = row.get(4)?;
    Ok(Enrollment {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        status: parse_enum(3, &status, EnrollmentStatus::from_str)?,
        enrolled_at: parse_timestamp(4, &enrolled_at)?,
        completed_at: parse_optional_timestamp(5, row.get(5)?)?,
    })
}

/// Get the enrollment for a (student, course) pair, whatever its status
pub fn get_enrollment(conn: &Connection, student_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM enrollments WHERE student_id = ?1 AND course_id = ?2",
            ENROLLMENT_COLUMNS
        ),
        params![student_id, course_id],
        enrollment_from_row,
    )
    .optional()
}

/// All enrollments of a student, oldest first
pub fn list_student_enrollments(conn: &Connection, student_id: i64) -> Result<Vec<Enrollment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM enrollments WHERE student_id = ?1 ORDER BY enrolled_at, id",
        ENROLLMENT_COLUMNS
    ))?;
    let enrollments = stmt
        .query_map(params![student_id], enrollment_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(enrollments)
}

/// Create an active enrollment, or reactivate a dropped one.
/// Returns None if the student already has an active or completed enrollment.
pub fn enroll(conn: &Connection, student_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
    let now = now_timestamp();
    let changed = conn.execute(
        r#"INSERT INTO enrollments (student_id, course_id, status, enrolled_at)
           VALUES (?1, ?2, 'active', ?3)
           ON CONFLICT(student_id, course_id)
             DO UPDATE SET status = 'active', enrolled_at = excluded.enrolled_at
           WHERE enrollments.status = 'dropped'"#,
        params![student_id, course_id, now],
    )?;

    if changed == 0 {
        return Ok(None);
    }
    get_enrollment(conn, student_id, course_id)
}

/// Active → Completed. Idempotent: returns false when the enrollment
/// is missing or not active (including already completed).
pub fn mark_completed(conn: &Connection, enrollment_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE enrollments SET status = 'completed', completed_at = ?1 WHERE id = ?2 AND status = 'active'",
        params![now_timestamp(), enrollment_id],
    )?;
    Ok(changed > 0)
}

/// Active → Dropped. Returns false when there is no active enrollment to drop.
pub fn drop_enrollment(conn: &Connection, student_id: i64, course_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE enrollments SET status = 'dropped' WHERE student_id = ?1 AND course_id = ?2 AND status = 'active'",
        params![student_id, course_id],
    )?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::testing::TestEnv;

    #[test]
    fn test_enroll_creates_active_enrollment() {
        let env = TestEnv::new().unwrap();
        let student = env.user("sam", Role::Student);
        let course = env.published_course(3);

        let enrollment = enroll(&env.conn, student, course.id).unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
        assert_eq!(enrollment.course_id, course.id);
        assert!(enrollment.completed_at.is_none());

        // Second enroll is refused while active
        assert!(enroll(&env.conn, student, course.id).unwrap().is_none());
    }

    #[test]
    fn test_dropped_enrollment_can_be_reactivated() {
        let env = TestEnv::new().unwrap();
        let student = env.user("sam", Role::Student);
        let course = env.published_course(1);

        let first = enroll(&env.conn, student, course.id).unwrap().unwrap();
        assert!(drop_enrollment(&env.conn, student, course.id).unwrap());
        assert!(!drop_enrollment(&env.conn, student, course.id).unwrap());
        assert_eq!(
            get_enrollment(&env.conn, student, course.id).unwrap().unwrap().status,
            EnrollmentStatus::Dropped
        );

        let again = enroll(&env.conn, student, course.id).unwrap().unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.status, EnrollmentStatus::Active);
    }

    #[test]
    fn test_reactivation_refreshes_enrolled_at() {
        let env = TestEnv::new().unwrap();
        let student = env.user("sam", Role::Student);
        let course = env.published_course(1);

        let first = enroll(&env.conn, student, course.id).unwrap().unwrap();
        let long_ago = "2020-01-01T00:00:00.000Z";
        env.conn
            .execute(
                "UPDATE enrollments SET enrolled_at = ?1 WHERE id = ?2",
                params![long_ago, first.id],
            )
            .unwrap();
        drop_enrollment(&env.conn, student, course.id).unwrap();

        let again = enroll(&env.conn, student, course.id).unwrap().unwrap();
        assert!(again.enrolled_at > parse_timestamp(0, long_ago).unwrap());
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let env = TestEnv::new().unwrap();
        let student = env.user("sam", Role::Student);
        let course = env.published_course(1);
        let enrollment = enroll(&env.conn, student, course.id).unwrap().unwrap();

        assert!(mark_completed(&env.conn, enrollment.id).unwrap());
        assert!(!mark_completed(&env.conn, enrollment.id).unwrap());

        let stored = get_enrollment(&env.conn, student, course.id).unwrap().unwrap();
        assert_eq!(stored.status, EnrollmentStatus::Completed);
        assert!(stored.completed_at.is_some());

        // Completed enrollments are not re-enrolled
        assert!(enroll(&env.conn, student, course.id).unwrap().is_none());
    }

    #[test]
    fn test_list_student_enrollments() {
        let env = TestEnv::new().unwrap();
        let student = env.user("sam", Role::Student);
        let other = env.user("kim", Role::Student);
        let c1 = env.published_course(1);
        let c2 = env.published_course(2);

        enroll(&env.conn, student, c1.id).unwrap();
        enroll(&env.conn, student, c2.id).unwrap();
        enroll(&env.conn, other, c1.id).unwrap();

        let mine = list_student_enrollments(&env.conn, student).unwrap();
        let course_ids: Vec<i64> = mine.iter().map(|e| e.course_id).collect();
        assert_eq!(course_ids, vec![c1.id, c2.id]);
    }
}
