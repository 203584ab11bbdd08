//! Account handlers: register, login, logout, current user and role management.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};

use super::db as auth_db;
use super::middleware::AuthContext;
use super::password;
use crate::db::{try_lock, LogOnError};
use crate::domain::Role;
use crate::error::{AccessError, AppError, AppResult, Resource};
use crate::extract::{Json, Path};
use crate::session::{generate_session_id, SESSION_COOKIE_NAME};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Requested role; only student and instructor can be self-assigned
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Session id, usable as a bearer token
    pub token: String,
    pub user: auth_db::UserInfo,
}

/// POST /auth/register - Create an account.
/// The very first account on a fresh install becomes the super admin.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let username = req.username.trim();
    if !is_valid_username(username) {
        return Err(AppError::BadRequest(
            "Username must be 3-32 characters: letters, digits or underscore".to_string(),
        ));
    }
    if req.password.len() < password::MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            password::MIN_PASSWORD_LEN
        )));
    }
    let requested = req.role.unwrap_or_default();
    if !matches!(requested, Role::Student | Role::Instructor) {
        return Err(AppError::Forbidden(
            "Only student or instructor accounts can be self-registered".to_string(),
        ));
    }

    // Hash before taking the lock, Argon2 is deliberately slow
    let password_hash = password::hash_password(&req.password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

    let conn = try_lock(&state.db)?;
    if auth_db::username_exists(&conn, username)? {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let role = if auth_db::get_user_count(&conn)? == 0 {
        tracing::info!("First account {} bootstrapped as super admin", username);
        Role::SuperAdmin
    } else {
        requested
    };

    let user_id = auth_db::create_user(&conn, username, &password_hash, role)?;
    let user = auth_db::get_user_by_id(&conn, user_id)?
        .ok_or(AccessError::NotFound(Resource::User))?;

    tracing::info!(user_id, role = role.as_str(), "Account registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/login - Verify credentials, open a session
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Username and password are required".to_string()));
    }

    let stored = {
        let conn = try_lock(&state.db)?;
        auth_db::get_user_by_username(&conn, username)?
    };

    let Some((user_id, password_hash)) = stored else {
        tracing::info!("Login failed for unknown user");
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify_password(&req.password, &password_hash) {
        tracing::info!(user_id, "Login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let session_id = generate_session_id();
    let user = {
        let conn = try_lock(&state.db)?;
        auth_db::update_last_login(&conn, user_id).log_warn("Failed to update last login");
        auth_db::create_session(&conn, user_id, &session_id, state.session_hours)?;
        auth_db::get_user_by_id(&conn, user_id)?.ok_or(AccessError::NotFound(Resource::User))?
    };

    tracing::debug!(user_id, "Session created");

    let session_cookie = Cookie::build((SESSION_COOKIE_NAME, session_id.clone()))
        .path("/")
        .http_only(true)
        .secure(false) // Set to true in production with HTTPS
        .max_age(time::Duration::hours(state.session_hours))
        .build();

    Ok((
        jar.add(session_cookie),
        Json(LoginResponse {
            token: session_id,
            user,
        }),
    ))
}

/// POST /auth/logout - Delete the current session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    {
        let conn = try_lock(&state.db)?;
        auth_db::delete_session(&conn, &auth.session_id)?;
    }

    let session_cookie = Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build();
    Ok((StatusCode::NO_CONTENT, jar.remove(session_cookie)))
}

/// GET /auth/me - Current account
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<auth_db::UserInfo>> {
    let conn = try_lock(&state.db)?;
    let user = auth_db::get_user_by_id(&conn, auth.user_id)?
        .ok_or(AccessError::NotFound(Resource::User))?;
    Ok(Json(user))
}

/// PUT /admin/users/{id}/role - Change a user's role.
/// Admins manage students and instructors; only a super admin may grant
/// or revoke admin-level roles.
pub async fn set_user_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<i64>,
    Json(update): Json<RoleUpdate>,
) -> AppResult<Json<auth_db::UserInfo>> {
    if !auth.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    if user_id == auth.user_id {
        return Err(AppError::BadRequest("You cannot change your own role".to_string()));
    }

    let conn = try_lock(&state.db)?;
    let target = auth_db::get_user_by_id(&conn, user_id)?
        .ok_or(AccessError::NotFound(Resource::User))?;

    let touches_admin = target.role.is_admin() || update.role.is_admin();
    if touches_admin && auth.role != Role::SuperAdmin {
        return Err(AppError::Forbidden(
            "Only a super admin can manage admin roles".to_string(),
        ));
    }

    auth_db::set_user_role(&conn, user_id, update.role)?;
    tracing::info!(
        by = auth.user_id,
        user_id,
        from = target.role.as_str(),
        to = update.role.as_str(),
        "Role changed"
    );

    let user = auth_db::get_user_by_id(&conn, user_id)?
        .ok_or(AccessError::NotFound(Resource::User))?;
    Ok(Json(user))
}

/// Validate username: 3-32 chars, alphanumeric or underscore
fn is_valid_username(username: &str) -> bool {
    username.len() >= 3
        && username.len() <= 32
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("user123"));
        assert!(is_valid_username("my_user"));
        assert!(is_valid_username("a".repeat(32).as_str()));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!is_valid_username("ab")); // too short
        assert!(!is_valid_username(&"a".repeat(33))); // too long
        assert!(!is_valid_username("user name")); // space
        assert!(!is_valid_username("user-name")); // hyphen
        assert!(!is_valid_username(""));
    }
}
