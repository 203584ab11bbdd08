//! Session identifiers and how requests carry them.

use axum::http::{header, HeaderMap};
use axum_extra::extract::CookieJar;

/// Cookie carrying the session id
pub const SESSION_COOKIE_NAME: &str = "lms_session";

/// Generate a new session ID
pub fn generate_session_id() -> String {
  use rand::Rng;
  let mut rng = rand::rng();
  (0..32)
    .map(|_| {
      let idx = rng.random_range(0..36);
      if idx < 10 {
        (b'0' + idx) as char
      } else {
        (b'a' + idx - 10) as char
      }
    })
    .collect()
}

/// Session id from the `Authorization: Bearer` header, falling back to the cookie
pub fn session_id_from_request(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
  let bearer = headers
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|token| !token.is_empty());

  if let Some(token) = bearer {
    return Some(token.to_string());
  }

  jar
    .get(SESSION_COOKIE_NAME)
    .map(|c| c.value().to_string())
    .filter(|v| !v.is_empty())
}
