//! Lesson completion and progress rollups.

use axum::extract::State;
use serde::Serialize;

use crate::auth::AuthContext;
use crate::db::{courses, enrollments, lesson_progress, try_lock};
use crate::error::{AccessError, AppError, AppResult, Resource};
use crate::extract::{Json, Path};
use crate::services::entitlement;
use crate::services::progress::{self, EnrollmentProgress, StudentOverview};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
  pub lesson_id: i64,
  pub is_completed: bool,
  /// Updated rollup, absent when the caller has no enrollment (e.g. owner or free preview)
  pub progress: Option<EnrollmentProgress>,
}

/// POST /lessons/{lesson_id}/completion - Flip a lesson's completion for the caller
pub async fn toggle_completion(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(lesson_id): Path<i64>,
) -> AppResult<Json<ToggleResponse>> {
  let conn = try_lock(&state.db)?;
  let identity = auth.identity();

  let course_id = courses::find_course_for_lesson(&conn, lesson_id)?
    .ok_or(AccessError::NotFound(Resource::Lesson))?;
  // A hidden course surfaces as a missing lesson, same as an unknown id
  entitlement::check_lesson_access(&conn, Some(&identity), course_id, lesson_id).map_err(
    |e| match e {
      AppError::Access(AccessError::NotFound(_)) => AccessError::NotFound(Resource::Lesson).into(),
      other => other,
    },
  )?;

  let is_completed = lesson_progress::toggle_completion(&conn, auth.user_id, lesson_id)?;
  tracing::debug!(student_id = auth.user_id, lesson_id, is_completed, "Lesson completion toggled");

  let progress = match enrollments::get_enrollment(&conn, auth.user_id, course_id)? {
    Some(_) => Some(progress::compute_enrollment_progress(&conn, auth.user_id, course_id)?),
    None => None,
  };

  Ok(Json(ToggleResponse {
    lesson_id,
    is_completed,
    progress,
  }))
}

/// GET /courses/{id}/progress - Caller's rollup for one enrollment
pub async fn course_progress(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<i64>,
) -> AppResult<Json<EnrollmentProgress>> {
  let conn = try_lock(&state.db)?;
  Ok(Json(progress::compute_enrollment_progress(&conn, auth.user_id, course_id)?))
}

/// GET /me/overview - Caller's rollup across all enrollments
pub async fn overview(
  State(state): State<AppState>,
  auth: AuthContext,
) -> AppResult<Json<StudentOverview>> {
  let conn = try_lock(&state.db)?;
  Ok(Json(progress::compute_student_overview(&conn, auth.user_id)?))
}
