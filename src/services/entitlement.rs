//! Lesson entitlement: may this requester stream (or track) this lesson?
//!
//! The ordered checks live in [`resolve`], which works on already-loaded
//! values. The grant/deny decision itself is the pure table in [`decide`].
//! [`check_lesson_access`] and [`check_playback_access`] load what the
//! resolver needs from the database.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{courses, enrollments};
use crate::domain::{Course, Enrollment, Identity, Lesson};
use crate::error::{AccessError, AppError, Resource};

/// Why access was granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    FreePreview,
    Enrolled,
    Owner,
    Admin,
}

impl Grant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grant::FreePreview => "free_preview",
            Grant::Enrolled => "enrolled",
            Grant::Owner => "owner",
            Grant::Admin => "admin",
        }
    }
}

/// What is known about an authenticated requester relative to one course
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessFacts {
    /// Active enrollment in a published course
    pub is_enrolled: bool,
    pub is_owner: bool,
    pub is_admin: bool,
}

impl AccessFacts {
    pub fn gather(identity: &Identity, course: &Course, enrollment: Option<&Enrollment>) -> Self {
        let is_enrolled = course.is_published()
            && enrollment.is_some_and(|e| {
                e.student_id == identity.user_id && e.course_id == course.id && e.is_active()
            });

        Self {
            is_enrolled,
            is_owner: identity.user_id == course.instructor_id,
            is_admin: identity.role.is_admin(),
        }
    }
}

/// Decision table for an authenticated requester
pub fn decide(facts: &AccessFacts) -> Result<Grant, AccessError> {
    match facts {
        AccessFacts { is_enrolled: true, .. } => Ok(Grant::Enrolled),
        AccessFacts { is_owner: true, .. } => Ok(Grant::Owner),
        AccessFacts { is_admin: true, .. } => Ok(Grant::Admin),
        _ => Err(AccessError::NotEnrolled),
    }
}

/// Owners and admins see courses in every lifecycle state
fn can_see_hidden(identity: &Identity, course: &Course) -> bool {
    identity.user_id == course.instructor_id || identity.role.is_admin()
}

/// A lesson the requester is allowed to use
#[derive(Debug, Clone, Copy)]
pub struct Entitled<'a> {
    pub lesson: &'a Lesson,
    pub grant: Grant,
}

/// Authorize a requester for one lesson of a course.
///
/// Checks run in order and the first match wins: missing course, hidden
/// course, lesson not in the course, free preview of a published course,
/// anonymous requester, then the [`decide`] table. Content availability is
/// not checked here.
///
/// An unpublished course is reported as missing to everyone but its owner
/// and admins, whatever lesson id is asked for.
pub fn resolve<'a>(
    requester: Option<&Identity>,
    course: Option<&'a Course>,
    lesson_id: i64,
    enrollment: Option<&Enrollment>,
) -> Result<Entitled<'a>, AccessError> {
    let course = course.ok_or(AccessError::NotFound(Resource::Course))?;
    if !course.is_published() && !requester.is_some_and(|i| can_see_hidden(i, course)) {
        return Err(AccessError::NotFound(Resource::Course));
    }
    let lesson = course
        .find_lesson(lesson_id)
        .ok_or(AccessError::NotFound(Resource::Lesson))?;

    if lesson.is_free_preview && course.is_published() {
        return Ok(Entitled {
            lesson,
            grant: Grant::FreePreview,
        });
    }

    let identity = requester.ok_or(AccessError::AuthenticationRequired)?;
    let grant = decide(&AccessFacts::gather(identity, course, enrollment))?;
    Ok(Entitled { lesson, grant })
}

/// [`resolve`], then require the lesson to have something to play
pub fn resolve_playback<'a>(
    requester: Option<&Identity>,
    course: Option<&'a Course>,
    lesson_id: i64,
    enrollment: Option<&Enrollment>,
) -> Result<Entitled<'a>, AccessError> {
    let entitled = resolve(requester, course, lesson_id, enrollment)?;
    if !entitled.lesson.has_media() {
        return Err(AccessError::NoContent);
    }
    Ok(entitled)
}

// ==================== Database-backed checks ====================

/// Owned result of a database-backed entitlement check
#[derive(Debug, Clone)]
pub struct LessonAccess {
    pub course: Course,
    pub lesson: Lesson,
    pub grant: Grant,
}

fn load_and_resolve(
    conn: &Connection,
    requester: Option<&Identity>,
    course_id: i64,
    lesson_id: i64,
    require_media: bool,
) -> Result<LessonAccess, AppError> {
    let course = courses::get_course_tree(conn, course_id)?;
    let enrollment = match requester {
        Some(identity) => enrollments::get_enrollment(conn, identity.user_id, course_id)?,
        None => None,
    };

    let outcome = if require_media {
        resolve_playback(requester, course.as_ref(), lesson_id, enrollment.as_ref())
    } else {
        resolve(requester, course.as_ref(), lesson_id, enrollment.as_ref())
    };

    match outcome {
        Ok(entitled) => {
            let lesson = entitled.lesson.clone();
            let grant = entitled.grant;
            tracing::debug!(course_id, lesson_id, grant = grant.as_str(), "Lesson access granted");
            match course {
                Some(course) => Ok(LessonAccess { course, lesson, grant }),
                None => Err(AccessError::NotFound(Resource::Course).into()),
            }
        }
        Err(denied) => {
            tracing::debug!(
                course_id,
                lesson_id,
                user_id = requester.map(|i| i.user_id),
                reason = %denied,
                "Lesson access denied"
            );
            Err(denied.into())
        }
    }
}

/// Entitlement for using a lesson (e.g. tracking completion)
pub fn check_lesson_access(
    conn: &Connection,
    requester: Option<&Identity>,
    course_id: i64,
    lesson_id: i64,
) -> Result<LessonAccess, AppError> {
    load_and_resolve(conn, requester, course_id, lesson_id, false)
}

/// Entitlement for streaming a lesson's media
pub fn check_playback_access(
    conn: &Connection,
    requester: Option<&Identity>,
    course_id: i64,
    lesson_id: i64,
) -> Result<LessonAccess, AppError> {
    load_and_resolve(conn, requester, course_id, lesson_id, true)
}
