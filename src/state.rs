//! Application state shared by all handlers.

use chrono::Duration;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::db::DbPool;
use crate::services::signing::HmacUrlSigner;
use crate::services::tickets::{TicketIssuer, TicketPolicy};

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application database (users, sessions, catalog, progress)
    pub db: DbPool,

    /// Mints and verifies signed media links
    pub tickets: Arc<TicketIssuer>,

    /// Root directory the media host serves from
    pub media_dir: PathBuf,

    /// Login session lifetime
    pub session_hours: i64,
}

impl AppState {
    pub fn new(db: DbPool, tickets: TicketIssuer, media_dir: PathBuf, session_hours: i64) -> Self {
        Self {
            db,
            tickets: Arc::new(tickets),
            media_dir,
            session_hours,
        }
    }

    /// Build state from resolved settings and an open database
    pub fn from_settings(db: DbPool, settings: &Settings) -> Self {
        let signer = Arc::new(HmacUrlSigner::new(settings.signing_secret.as_bytes()));
        let policy = TicketPolicy {
            default_ttl: Duration::seconds(settings.ticket_ttl_secs),
            max_ttl: Duration::seconds(settings.ticket_max_ttl_secs),
        };
        let tickets = TicketIssuer::new(signer, &settings.media_base_url, policy);
        Self::new(
            db,
            tickets,
            settings.media_dir.clone(),
            settings.session_expiry_hours,
        )
    }
}
