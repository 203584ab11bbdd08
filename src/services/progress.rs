//! Progress rollups derived from lesson completion rows.
//!
//! Nothing here is stored: every number is recomputed from
//! `lesson_progress` on read. The one write is the Active → Completed
//! enrollment transition once every lesson of the course is done.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{courses, enrollments, lesson_progress};
use crate::domain::{Course, Enrollment, EnrollmentStatus, LessonProgress};
use crate::error::{AccessError, AppError, Resource};

/// Rollup for one enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentProgress {
    pub course_id: i64,
    pub course_title: String,
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub progress_percent: u32,
    pub last_active: DateTime<Utc>,
    pub status: EnrollmentStatus,
}

impl EnrollmentProgress {
    /// Every lesson done in a non-empty course
    pub fn is_finished(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons == self.total_lessons
    }
}

/// Cross-course rollup for one student, weighted by lesson count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverview {
    pub student_id: i64,
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub overall_percent: u32,
    pub enrollments: Vec<EnrollmentProgress>,
}

/// Percentage rounded half-up, 0 for an empty total
pub fn percent(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (completed, total) = (u64::from(completed), u64::from(total));
    ((200 * completed + total) / (2 * total)) as u32
}

/// Rollup for an enrollment from the student's progress rows.
/// Rows for lessons outside the course, or for other students, are ignored.
pub fn enrollment_progress(
    course: &Course,
    enrollment: &Enrollment,
    progress: &[LessonProgress],
) -> EnrollmentProgress {
    let completed: Vec<&LessonProgress> = progress
        .iter()
        .filter(|p| {
            p.is_completed
                && p.student_id == enrollment.student_id
                && course.contains_lesson(p.lesson_id)
        })
        .collect();

    let total_lessons = course.lesson_count() as u32;
    let completed_lessons = completed.len() as u32;
    let last_active = completed
        .iter()
        .filter_map(|p| p.completed_at)
        .max()
        .unwrap_or(enrollment.enrolled_at);

    EnrollmentProgress {
        course_id: course.id,
        course_title: course.title.clone(),
        total_lessons,
        completed_lessons,
        progress_percent: percent(completed_lessons, total_lessons),
        last_active,
        status: enrollment.status,
    }
}

/// Combine per-enrollment rollups into a lesson-weighted overview
pub fn student_overview(student_id: i64, enrollments: Vec<EnrollmentProgress>) -> StudentOverview {
    let total_lessons = enrollments.iter().map(|e| e.total_lessons).sum();
    let completed_lessons = enrollments.iter().map(|e| e.completed_lessons).sum();

    StudentOverview {
        student_id,
        total_lessons,
        completed_lessons,
        overall_percent: percent(completed_lessons, total_lessons),
        enrollments,
    }
}

// ==================== Database-backed rollups ====================

/// Compute an enrollment's rollup and apply the completion write-back
fn rollup(conn: &Connection, course: &Course, enrollment: &Enrollment) -> Result<EnrollmentProgress, AppError> {
    let rows = lesson_progress::list_course_progress(conn, enrollment.student_id, course.id)?;
    let mut progress = enrollment_progress(course, enrollment, &rows);

    if enrollment.is_active() && progress.is_finished() {
        if enrollments::mark_completed(conn, enrollment.id)? {
            tracing::info!(
                student_id = enrollment.student_id,
                course_id = course.id,
                "Enrollment completed"
            );
        }
        progress.status = EnrollmentStatus::Completed;
    }
    Ok(progress)
}

/// Rollup for a student's enrollment in a course
pub fn compute_enrollment_progress(
    conn: &Connection,
    student_id: i64,
    course_id: i64,
) -> Result<EnrollmentProgress, AppError> {
    let course = courses::get_course_tree(conn, course_id)?
        .ok_or(AccessError::NotFound(Resource::Course))?;
    let enrollment = enrollments::get_enrollment(conn, student_id, course_id)?
        .ok_or(AccessError::NotFound(Resource::Enrollment))?;
    rollup(conn, &course, &enrollment)
}

/// Rollups for every enrollment of a student, whatever its status
pub fn compute_student_overview(conn: &Connection, student_id: i64) -> Result<StudentOverview, AppError> {
    let mut items = Vec::new();
    for enrollment in enrollments::list_student_enrollments(conn, student_id)? {
        let course = courses::get_course_tree(conn, enrollment.course_id)?
            .ok_or(AccessError::NotFound(Resource::Course))?;
        items.push(rollup(conn, &course, &enrollment)?);
    }
    Ok(student_overview(student_id, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::course::fixtures;
    use crate::domain::CourseStatus;
    use chrono::Duration;

    const STUDENT: i64 = 42;

    fn enrollment(course_id: i64) -> Enrollment {
        Enrollment {
            id: course_id,
            student_id: STUDENT,
            course_id,
            status: EnrollmentStatus::Active,
            enrolled_at: Utc::now() - Duration::days(3),
            completed_at: None,
        }
    }

    fn done(lesson_id: i64, at: DateTime<Utc>) -> LessonProgress {
        LessonProgress {
            student_id: STUDENT,
            lesson_id,
            is_completed: true,
            completed_at: Some(at),
        }
    }

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(5, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13); // 12.5
        assert_eq!(percent(1, 200), 1); // 0.5
        assert_eq!(percent(199, 200), 100); // 99.5
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn test_zero_lesson_course_is_zero_percent() {
        let course = fixtures::course(1, 7, CourseStatus::Published, &[]);
        let p = enrollment_progress(&course, &enrollment(1), &[]);
        assert_eq!(p.total_lessons, 0);
        assert_eq!(p.progress_percent, 0);
        assert!(!p.is_finished());
    }

    #[test]
    fn test_progress_counts_only_completed_rows_of_course() {
        let course = fixtures::course(1, 7, CourseStatus::Published, &[2, 1]);
        let now = Utc::now();
        let mut undone = done(1002, now);
        undone.is_completed = false;
        undone.completed_at = None;
        let mut someone_else = done(1003, now);
        someone_else.student_id = STUDENT + 1;

        let rows = vec![done(1001, now), undone, someone_else, done(2001, now)];
        let p = enrollment_progress(&course, &enrollment(1), &rows);
        assert_eq!(p.total_lessons, 3);
        assert_eq!(p.completed_lessons, 1);
        assert_eq!(p.progress_percent, 33);
    }

    #[test]
    fn test_last_active_is_latest_completion_or_enrollment() {
        let course = fixtures::course(1, 7, CourseStatus::Published, &[3]);
        let e = enrollment(1);

        assert_eq!(enrollment_progress(&course, &e, &[]).last_active, e.enrolled_at);

        let earlier = Utc::now() - Duration::hours(5);
        let later = Utc::now() - Duration::hours(1);
        let p = enrollment_progress(&course, &e, &[done(1002, later), done(1001, earlier)]);
        assert_eq!(p.last_active, later);
    }

    #[test]
    fn test_overview_is_lesson_weighted() {
        let small = fixtures::course(1, 7, CourseStatus::Published, &[2]);
        let large = fixtures::course(2, 7, CourseStatus::Published, &[8]);
        let now = Utc::now();

        let a = enrollment_progress(&small, &enrollment(1), &[done(1001, now)]);
        let b = enrollment_progress(&large, &enrollment(2), &[done(2001, now)]);
        assert_eq!(a.progress_percent, 50);
        assert_eq!(b.progress_percent, 13);

        let overview = student_overview(STUDENT, vec![a, b]);
        assert_eq!(overview.total_lessons, 10);
        assert_eq!(overview.completed_lessons, 2);
        // Not the 31% an average of percentages would give
        assert_eq!(overview.overall_percent, 20);
    }

    #[test]
    fn test_empty_overview() {
        let overview = student_overview(STUDENT, Vec::new());
        assert_eq!(overview.overall_percent, 0);
        assert!(overview.enrollments.is_empty());
    }

    mod with_db {
        use super::*;
        use crate::domain::Role;
        use crate::testing::TestEnv;

        fn lesson_ids(course: &Course) -> Vec<i64> {
            course.lessons().map(|l| l.id).collect()
        }

        #[test]
        fn test_one_of_three_stays_active() {
            let env = TestEnv::new().unwrap();
            let sam = env.user("sam", Role::Student);
            let course = env.published_course(3);
            enrollments::enroll(&env.conn, sam, course.id).unwrap();

            lesson_progress::toggle_completion(&env.conn, sam, lesson_ids(&course)[0]).unwrap();
            let p = compute_enrollment_progress(&env.conn, sam, course.id).unwrap();
            assert_eq!(p.completed_lessons, 1);
            assert_eq!(p.progress_percent, 33);
            assert_eq!(p.status, EnrollmentStatus::Active);
        }

        #[test]
        fn test_all_lessons_complete_the_enrollment() {
            let env = TestEnv::new().unwrap();
            let sam = env.user("sam", Role::Student);
            let course = env.published_course(3);
            enrollments::enroll(&env.conn, sam, course.id).unwrap();

            for id in lesson_ids(&course) {
                lesson_progress::toggle_completion(&env.conn, sam, id).unwrap();
            }
            let p = compute_enrollment_progress(&env.conn, sam, course.id).unwrap();
            assert_eq!(p.progress_percent, 100);
            assert_eq!(p.status, EnrollmentStatus::Completed);

            let stored = enrollments::get_enrollment(&env.conn, sam, course.id).unwrap().unwrap();
            assert_eq!(stored.status, EnrollmentStatus::Completed);
            assert!(stored.completed_at.is_some());
        }

        #[test]
        fn test_recompute_is_idempotent() {
            let env = TestEnv::new().unwrap();
            let sam = env.user("sam", Role::Student);
            let course = env.published_course(2);
            enrollments::enroll(&env.conn, sam, course.id).unwrap();

            lesson_progress::toggle_completion(&env.conn, sam, lesson_ids(&course)[0]).unwrap();
            let first = compute_enrollment_progress(&env.conn, sam, course.id).unwrap();
            let second = compute_enrollment_progress(&env.conn, sam, course.id).unwrap();
            assert_eq!(first, second);

            lesson_progress::toggle_completion(&env.conn, sam, lesson_ids(&course)[1]).unwrap();
            let first = compute_enrollment_progress(&env.conn, sam, course.id).unwrap();
            let second = compute_enrollment_progress(&env.conn, sam, course.id).unwrap();
            assert_eq!(first, second);
            assert_eq!(second.status, EnrollmentStatus::Completed);
        }

        #[test]
        fn test_dropped_enrollment_is_not_completed() {
            let env = TestEnv::new().unwrap();
            let sam = env.user("sam", Role::Student);
            let course = env.published_course(1);
            enrollments::enroll(&env.conn, sam, course.id).unwrap();
            lesson_progress::toggle_completion(&env.conn, sam, lesson_ids(&course)[0]).unwrap();
            enrollments::drop_enrollment(&env.conn, sam, course.id).unwrap();

            let p = compute_enrollment_progress(&env.conn, sam, course.id).unwrap();
            assert_eq!(p.progress_percent, 100);
            assert_eq!(p.status, EnrollmentStatus::Dropped);
        }

        #[test]
        fn test_missing_enrollment() {
            let env = TestEnv::new().unwrap();
            let sam = env.user("sam", Role::Student);
            let course = env.published_course(1);
            let err = compute_enrollment_progress(&env.conn, sam, course.id).unwrap_err();
            assert!(matches!(err, AppError::Access(AccessError::NotFound(Resource::Enrollment))));
        }

        #[test]
        fn test_overview_from_database() {
            let env = TestEnv::new().unwrap();
            let sam = env.user("sam", Role::Student);
            let small = env.published_course(2);
            let large = env.published_course(8);
            enrollments::enroll(&env.conn, sam, small.id).unwrap();
            enrollments::enroll(&env.conn, sam, large.id).unwrap();
            lesson_progress::toggle_completion(&env.conn, sam, lesson_ids(&small)[0]).unwrap();
            lesson_progress::toggle_completion(&env.conn, sam, lesson_ids(&large)[0]).unwrap();

            let overview = compute_student_overview(&env.conn, sam).unwrap();
            assert_eq!(overview.enrollments.len(), 2);
            assert_eq!(overview.overall_percent, 20);
        }
    }
}
