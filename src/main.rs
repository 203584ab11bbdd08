use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_playback::auth::db as auth_db;
use lms_playback::config::Settings;
use lms_playback::db::{self, LogOnError};
use lms_playback::router;
use lms_playback::state::AppState;

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lms_playback=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = Settings::load().expect("Invalid configuration");

  tracing::info!("Using database {}", settings.database_path.display());
  let pool = db::init_db(&settings.database_path).expect("Failed to initialize database");

  {
    let conn = db::try_lock(&pool).expect("Database lock failed during startup");
    if let Some(removed) = auth_db::cleanup_expired_sessions(&conn).log_warn("Failed to clean up sessions") {
      if removed > 0 {
        tracing::info!("Removed {} expired sessions", removed);
      }
    }
  }

  if let Err(e) = std::fs::create_dir_all(&settings.media_dir) {
    tracing::warn!("Could not create media directory {}: {}", settings.media_dir.display(), e);
  }
  tracing::info!("Serving media from {}", settings.media_dir.display());

  let app = router::app(AppState::from_settings(pool, &settings));

  let bind_addr = settings.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://{}", bind_addr);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
