pub mod courses;
pub mod playback;
pub mod progress;

use axum::Json;
use serde_json::{json, Value};

/// GET /health
pub async fn health() -> Json<Value> {
  Json(json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

pub use courses::{
  add_lesson, add_module, create_course, drop_enrollment, enroll, get_course, list_courses,
  set_course_status,
};
pub use playback::{serve_media, video_ticket};
pub use progress::{course_progress, overview, toggle_completion};
