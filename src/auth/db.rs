//! Account storage (users and sessions tables).

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use crate::db::{format_timestamp, now_timestamp, parse_enum};
use crate::domain::Role;

/// User info for API display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: String,
}

/// Create a new user, returns the user ID
pub fn create_user(conn: &Connection, username: &str, password_hash: &str, role: Role) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, password_hash, role.as_str(), now_timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get user by username, returns (user_id, password_hash)
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<(i64, String)>> {
    conn.query_row(
        "SELECT id, password_hash FROM users WHERE username = ?1",
        params![username],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Check if a username already exists (case-insensitive)
pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Get user count (the first account bootstraps the platform)
pub fn get_user_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

pub fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<UserInfo>> {
    conn.query_row(
        "SELECT id, username, role, created_at FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            let role: String = row.get(2)?;
            Ok(UserInfo {
                id: row.get(0)?,
                username: row.get(1)?,
                role: parse_enum(2, &role, Role::from_str)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Set user role. Returns false if the user doesn't exist.
pub fn set_user_role(conn: &Connection, user_id: i64, role: Role) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), user_id],
    )?;
    Ok(changed > 0)
}

/// Update user's last login timestamp
pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![now_timestamp(), user_id],
    )?;
    Ok(())
}

// ==================== Sessions ====================

/// User behind a valid session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

/// Create a new session
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    session_id: &str,
    duration_hours: i64,
) -> Result<()> {
    let now = Utc::now();
    let expires = now + Duration::hours(duration_hours);
    conn.execute(
        "INSERT INTO sessions (id, user_id, created_at, expires_at, last_access_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session_id,
            user_id,
            format_timestamp(now),
            format_timestamp(expires),
            format_timestamp(now)
        ],
    )?;
    Ok(())
}

/// Validate session and get the user behind it
pub fn get_session_user(conn: &Connection, session_id: &str) -> Result<Option<SessionUser>> {
    let now = now_timestamp();
    let user = conn
        .query_row(
            r#"
            SELECT u.id, u.username, u.role
            FROM sessions s
            JOIN users u ON s.user_id = u.id
            WHERE s.id = ?1 AND s.expires_at > ?2
        "#,
            params![session_id, now],
            |row| {
                let role: String = row.get(2)?;
                Ok(SessionUser {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    role: parse_enum(2, &role, Role::from_str)?,
                })
            },
        )
        .optional()?;

    if user.is_some() {
        conn.execute(
            "UPDATE sessions SET last_access_at = ?1 WHERE id = ?2",
            params![now, session_id],
        )?;
    }
    Ok(user)
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
    Ok(())
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expires_at < ?1",
        params![now_timestamp()],
    )?;
    Ok(count)
}
