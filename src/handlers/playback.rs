//! Playback tickets and the signed media host.

use axum::{
  body::Body,
  extract::{Request, State},
  response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::auth::OptionalAuth;
use crate::db::try_lock;
use crate::error::{AccessError, AppResult, SignatureError};
use crate::extract::{Json, Path, Query};
use crate::services::entitlement;
use crate::services::tickets::{MediaKey, PlaybackTicket, SignedQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
  /// Requested lifetime in seconds
  pub ttl: Option<i64>,
}

/// GET /courses/{id}/lessons/{lesson_id}/video-ticket
pub async fn video_ticket(
  State(state): State<AppState>,
  auth: OptionalAuth,
  Path((course_id, lesson_id)): Path<(i64, i64)>,
  Query(query): Query<TicketQuery>,
) -> AppResult<Json<PlaybackTicket>> {
  let identity = auth.identity();

  let access = {
    let conn = try_lock(&state.db)?;
    entitlement::check_playback_access(&conn, identity.as_ref(), course_id, lesson_id)?
  };

  let locator = access
    .lesson
    .media_locator
    .as_deref()
    .ok_or(AccessError::NoContent)?;

  let ticket = state.tickets.issue(locator, course_id, lesson_id, query.ttl)?;
  Ok(Json(ticket))
}

/// GET /media/{*key} - Serve a media file for a valid signed link.
/// Range requests are handled by `ServeFile`.
pub async fn serve_media(
  State(state): State<AppState>,
  Path(key): Path<String>,
  Query(query): Query<SignedQuery>,
  request: Request,
) -> AppResult<Response> {
  let lesson_id = state.tickets.verify(&key, &query, Utc::now())?;

  // Signed keys were parsed at issue time, this only guards the filesystem join
  let key = MediaKey::parse(&key).map_err(|_| SignatureError::Invalid)?;
  let path = state.media_dir.join(key.as_str());
  tracing::debug!(lesson_id, key = key.as_str(), "Serving media");

  let response = match ServeFile::new(path).oneshot(request).await {
    Ok(response) => response,
    Err(never) => match never {},
  };
  Ok(response.map(Body::new))
}
