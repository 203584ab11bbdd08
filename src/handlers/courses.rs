//! Course catalog, authoring and enrollment handlers.

use axum::{extract::State, http::StatusCode};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthContext, OptionalAuth};
use crate::db::courses::{self, CourseSummary, NewLesson};
use crate::db::{enrollments, try_lock};
use crate::domain::{ContentKind, Course, CourseStatus, Enrollment, Identity};
use crate::error::{AccessError, AppError, AppResult, Resource};
use crate::extract::{Json, Path};
use crate::services::tickets::MediaKey;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCourse {
  pub title: String,
  pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
  pub status: CourseStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateModule {
  pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLesson {
  pub title: String,
  #[serde(default)]
  pub kind: ContentKind,
  pub media_locator: Option<String>,
  #[serde(default)]
  pub is_free_preview: bool,
}

#[derive(Debug, Serialize)]
pub struct Created {
  pub id: i64,
}

/// Owners and admins see a course whatever its status
fn can_manage(identity: &Identity, course: &Course) -> bool {
  identity.role.is_admin() || identity.user_id == course.instructor_id
}

fn can_view(identity: Option<&Identity>, course: &Course) -> bool {
  course.is_published() || identity.is_some_and(|i| can_manage(i, course))
}

fn load_course(conn: &Connection, course_id: i64) -> AppResult<Course> {
  Ok(courses::get_course_tree(conn, course_id)?.ok_or(AccessError::NotFound(Resource::Course))?)
}

/// Load a course the requester may edit.
/// Courses the requester cannot even see are reported as missing.
fn load_managed_course(conn: &Connection, auth: &AuthContext, course_id: i64) -> AppResult<Course> {
  let identity = auth.identity();
  let course = load_course(conn, course_id)?;
  if !can_view(Some(&identity), &course) {
    return Err(AccessError::NotFound(Resource::Course).into());
  }
  if !can_manage(&identity, &course) {
    return Err(AppError::Forbidden("Only the course owner can change this course".to_string()));
  }
  Ok(course)
}

fn require_title(title: &str) -> AppResult<&str> {
  let title = title.trim();
  if title.is_empty() {
    return Err(AppError::BadRequest("Title is required".to_string()));
  }
  Ok(title)
}

/// GET /courses
pub async fn list_courses(
  State(state): State<AppState>,
  auth: OptionalAuth,
) -> AppResult<Json<Vec<CourseSummary>>> {
  let conn = try_lock(&state.db)?;
  let identity = auth.identity();
  Ok(Json(courses::list_courses(&conn, identity.as_ref())?))
}

/// POST /courses - Create a draft course owned by the caller
pub async fn create_course(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<CreateCourse>,
) -> AppResult<(StatusCode, Json<Course>)> {
  if !auth.role.can_author() {
    return Err(AppError::Forbidden("Only instructors can create courses".to_string()));
  }
  let title = require_title(&req.title)?;

  let conn = try_lock(&state.db)?;
  let course_id = courses::create_course(&conn, auth.user_id, title, req.description.as_deref())?;
  tracing::info!(course_id, instructor_id = auth.user_id, "Course created");

  Ok((StatusCode::CREATED, Json(load_course(&conn, course_id)?)))
}

/// GET /courses/{id}
pub async fn get_course(
  State(state): State<AppState>,
  auth: OptionalAuth,
  Path(course_id): Path<i64>,
) -> AppResult<Json<Course>> {
  let conn = try_lock(&state.db)?;
  let course = load_course(&conn, course_id)?;
  if !can_view(auth.identity().as_ref(), &course) {
    return Err(AccessError::NotFound(Resource::Course).into());
  }
  Ok(Json(course))
}

/// PUT /courses/{id}/status
pub async fn set_course_status(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<i64>,
  Json(update): Json<StatusUpdate>,
) -> AppResult<Json<Course>> {
  let conn = try_lock(&state.db)?;
  let course = load_managed_course(&conn, &auth, course_id)?;

  courses::set_course_status(&conn, course_id, update.status)?;
  tracing::info!(
    course_id,
    from = course.status.as_str(),
    to = update.status.as_str(),
    "Course status changed"
  );
  Ok(Json(load_course(&conn, course_id)?))
}

/// POST /courses/{id}/modules
pub async fn add_module(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<i64>,
  Json(req): Json<CreateModule>,
) -> AppResult<(StatusCode, Json<Created>)> {
  let title = require_title(&req.title)?;
  let conn = try_lock(&state.db)?;
  load_managed_course(&conn, &auth, course_id)?;

  let id = courses::add_module(&conn, course_id, title)?;
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// POST /courses/{id}/modules/{module_id}/lessons
pub async fn add_lesson(
  State(state): State<AppState>,
  auth: AuthContext,
  Path((course_id, module_id)): Path<(i64, i64)>,
  Json(req): Json<CreateLesson>,
) -> AppResult<(StatusCode, Json<Created>)> {
  let title = require_title(&req.title)?;

  let media_locator = req
    .media_locator
    .as_deref()
    .map(str::trim)
    .filter(|m| !m.is_empty());
  if let Some(locator) = media_locator {
    MediaKey::parse(locator)
      .map_err(|reason| AppError::BadRequest(format!("Invalid media locator: {}", reason)))?;
  }

  let conn = try_lock(&state.db)?;
  load_managed_course(&conn, &auth, course_id)?;
  if courses::get_module_course_id(&conn, module_id)? != Some(course_id) {
    return Err(AccessError::NotFound(Resource::Module).into());
  }

  let id = courses::add_lesson(
    &conn,
    module_id,
    &NewLesson {
      title,
      kind: req.kind,
      media_locator,
      is_free_preview: req.is_free_preview,
    },
  )?;
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// POST /courses/{id}/enroll - Enroll in a published course
pub async fn enroll(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<i64>,
) -> AppResult<(StatusCode, Json<Enrollment>)> {
  let conn = try_lock(&state.db)?;
  let identity = auth.identity();
  let course = load_course(&conn, course_id)?;

  if !can_view(Some(&identity), &course) {
    return Err(AccessError::NotFound(Resource::Course).into());
  }
  if !course.is_published() {
    return Err(AppError::BadRequest("Course is not open for enrollment".to_string()));
  }

  let enrollment = enrollments::enroll(&conn, auth.user_id, course_id)?
    .ok_or_else(|| AppError::Conflict("Already enrolled in this course".to_string()))?;
  tracing::info!(student_id = auth.user_id, course_id, "Enrolled");

  Ok((StatusCode::CREATED, Json(enrollment)))
}

/// POST /courses/{id}/drop - Leave an active enrollment
pub async fn drop_enrollment(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<i64>,
) -> AppResult<Json<Enrollment>> {
  let conn = try_lock(&state.db)?;
  if !enrollments::drop_enrollment(&conn, auth.user_id, course_id)? {
    return Err(AccessError::NotFound(Resource::Enrollment).into());
  }
  tracing::info!(student_id = auth.user_id, course_id, "Enrollment dropped");

  let enrollment = enrollments::get_enrollment(&conn, auth.user_id, course_id)?
    .ok_or(AccessError::NotFound(Resource::Enrollment))?;
  Ok(Json(enrollment))
}
