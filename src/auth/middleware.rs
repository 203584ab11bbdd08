//! Authentication extractors.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::CookieJar;

use super::db as auth_db;
use crate::db::try_lock;
use crate::domain::{Identity, Role};
use crate::error::{AccessError, AppError};
use crate::session::session_id_from_request;
use crate::state::AppState;

/// Authenticated request context.
/// Add this as a handler parameter to require authentication.
/// Rejects with 401 if the request carries no valid session.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub session_id: String,
}

impl AuthContext {
    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id, self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = session_id_from_request(&parts.headers, &jar)
            .ok_or(AccessError::AuthenticationRequired)?;

        let conn = try_lock(&state.db)?;
        let user = auth_db::get_session_user(&conn, &session_id)?
            .ok_or(AccessError::AuthenticationRequired)?;

        Ok(AuthContext {
            user_id: user.user_id,
            username: user.username,
            role: user.role,
            session_id,
        })
    }
}

/// Optional authentication extractor.
/// Returns Some(AuthContext) if authenticated, None otherwise.
/// Use for endpoints that also serve anonymous callers (free previews, the catalog).
pub struct OptionalAuth(pub Option<AuthContext>);

impl OptionalAuth {
    pub fn identity(&self) -> Option<Identity> {
        self.0.as_ref().map(AuthContext::identity)
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthContext::from_request_parts(parts, state).await {
            Ok(auth) => Ok(OptionalAuth(Some(auth))),
            Err(AppError::Access(AccessError::AuthenticationRequired)) => Ok(OptionalAuth(None)),
            Err(e) => Err(e),
        }
    }
}
