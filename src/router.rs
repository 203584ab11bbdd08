//! HTTP route table.

use axum::{
  routing::{get, post, put},
  Router,
};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::handlers;
use crate::state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    // Accounts
    .route("/auth/register", post(auth::register))
    .route("/auth/login", post(auth::login))
    .route("/auth/logout", post(auth::logout))
    .route("/auth/me", get(auth::me))
    .route("/admin/users/{id}/role", put(auth::set_user_role))
    // Catalog and enrollment
    .route("/courses", get(handlers::list_courses).post(handlers::create_course))
    .route("/courses/{id}", get(handlers::get_course))
    .route("/courses/{id}/status", put(handlers::set_course_status))
    .route("/courses/{id}/modules", post(handlers::add_module))
    .route("/courses/{id}/modules/{module_id}/lessons", post(handlers::add_lesson))
    .route("/courses/{id}/enroll", post(handlers::enroll))
    .route("/courses/{id}/drop", post(handlers::drop_enrollment))
    // Playback
    .route("/courses/{id}/lessons/{lesson_id}/video-ticket", get(handlers::video_ticket))
    .route("/media/{*key}", get(handlers::serve_media))
    // Progress
    .route("/lessons/{lesson_id}/completion", post(handlers::toggle_completion))
    .route("/courses/{id}/progress", get(handlers::course_progress))
    .route("/me/overview", get(handlers::overview))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
