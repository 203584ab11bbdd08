//! Playback tickets: short-lived signed media URLs.
//!
//! A ticket URL looks like
//! `{base}/{key}?lesson={id}&exp={unix}&nonce={hex}&sig={hex}` where `sig`
//! signs `v1\n{key}\n{lesson}\n{exp}\n{nonce}`. The expiry is inside the
//! signed payload, so the link carries its own validity and nothing is stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::signing::UrlSigner;
use crate::error::{SignatureError, TicketError};

const SIGNATURE_VERSION: &str = "v1";
const MEDIA_SCHEME: &str = "media://";
const MAX_KEY_LEN: usize = 512;

/// Validated object key of a stored media asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaKey(String);

impl MediaKey {
    /// Parse a stored media locator into an object key.
    ///
    /// Accepts an optional `media://` prefix followed by `/`-separated
    /// segments of `[A-Za-z0-9._-]`. Empty, `.` and `..` segments are rejected.
    pub fn parse(locator: &str) -> Result<Self, &'static str> {
        let key = locator.strip_prefix(MEDIA_SCHEME).unwrap_or(locator);

        if key.is_empty() {
            return Err("empty key");
        }
        if key.len() > MAX_KEY_LEN {
            return Err("key too long");
        }
        if key.contains("://") {
            return Err("unsupported scheme");
        }
        for segment in key.split('/') {
            match segment {
                "" => return Err("empty path segment"),
                "." | ".." => return Err("path traversal"),
                _ => {}
            }
            if !segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
            {
                return Err("invalid character");
            }
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key with each segment percent-encoded for use in a URL path
    fn url_path(&self) -> String {
        self.0
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Ticket lifetime rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketPolicy {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
}

impl Default for TicketPolicy {
    fn default() -> Self {
        Self {
            default_ttl: Duration::hours(2),
            max_ttl: Duration::hours(12),
        }
    }
}

impl TicketPolicy {
    /// Lifetime for a request: the default when none is asked for, clamped to the maximum
    pub fn lifetime(&self, requested_secs: Option<i64>) -> Result<Duration, TicketError> {
        let ttl = match requested_secs {
            Some(secs) if secs <= 0 => return Err(TicketError::InvalidLifetime),
            Some(secs) => Duration::try_seconds(secs).unwrap_or(self.max_ttl),
            None => self.default_ttl,
        };
        Ok(ttl.min(self.max_ttl))
    }
}

/// A signed, expiring playback URL
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackTicket {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Query parameters of a signed media link
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignedQuery {
    pub lesson: Option<String>,
    pub exp: Option<String>,
    pub nonce: Option<String>,
    pub sig: Option<String>,
}

fn signing_payload(key: &str, lesson_id: i64, expires_unix: i64, nonce: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}",
        SIGNATURE_VERSION, key, lesson_id, expires_unix, nonce
    )
}

/// Check a signed media link.
///
/// Pure: depends only on the key, the query, the signer's secret and `now`.
/// Returns the lesson id the link was issued for.
pub fn verify_link(
    signer: &dyn UrlSigner,
    key: &str,
    query: &SignedQuery,
    now: DateTime<Utc>,
) -> Result<i64, SignatureError> {
    let (Some(lesson), Some(exp), Some(nonce), Some(sig)) =
        (&query.lesson, &query.exp, &query.nonce, &query.sig)
    else {
        return Err(SignatureError::Missing);
    };

    let lesson_id: i64 = lesson.parse().map_err(|_| SignatureError::Invalid)?;
    let expires_unix: i64 = exp.parse().map_err(|_| SignatureError::Invalid)?;

    if !signer.verify(&signing_payload(key, lesson_id, expires_unix, nonce), sig) {
        return Err(SignatureError::Invalid);
    }
    if now.timestamp() >= expires_unix {
        return Err(SignatureError::Expired);
    }
    Ok(lesson_id)
}

/// Mints playback tickets for authorized lessons
pub struct TicketIssuer {
    signer: Arc<dyn UrlSigner>,
    base_url: String,
    policy: TicketPolicy,
}

impl TicketIssuer {
    pub fn new(signer: Arc<dyn UrlSigner>, base_url: &str, policy: TicketPolicy) -> Self {
        Self {
            signer,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }

    /// Issue a ticket for a lesson's media locator.
    /// `course_id` and `lesson_id` also give log context on failure.
    pub fn issue(
        &self,
        locator: &str,
        course_id: i64,
        lesson_id: i64,
        requested_ttl_secs: Option<i64>,
    ) -> Result<PlaybackTicket, TicketError> {
        self.issue_at(locator, course_id, lesson_id, requested_ttl_secs, Utc::now())
    }

    pub fn issue_at(
        &self,
        locator: &str,
        course_id: i64,
        lesson_id: i64,
        requested_ttl_secs: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<PlaybackTicket, TicketError> {
        let ttl = self.policy.lifetime(requested_ttl_secs)?;

        let key = MediaKey::parse(locator).map_err(|reason| {
            tracing::error!(
                course_id,
                lesson_id,
                locator,
                reason,
                "Stored media locator cannot be addressed"
            );
            TicketError::ContentAddressing {
                locator: locator.to_string(),
                reason,
            }
        })?;

        let expires = now
            .checked_add_signed(ttl)
            .ok_or(TicketError::InvalidLifetime)?;
        let expires_unix = expires.timestamp();
        let nonce = format!("{:032x}", rand::random::<u128>());
        let payload = signing_payload(key.as_str(), lesson_id, expires_unix, &nonce);
        let sig = self.signer.sign(&payload);

        let url = format!(
            "{}/{}?lesson={}&exp={}&nonce={}&sig={}",
            self.base_url,
            key.url_path(),
            lesson_id,
            expires_unix,
            nonce,
            sig
        );
        let expires_at = DateTime::from_timestamp(expires_unix, 0).unwrap_or(expires);

        tracing::debug!(course_id, lesson_id, expires_unix, "Playback ticket issued");
        Ok(PlaybackTicket { url, expires_at })
    }

    /// Check a signed link against this issuer's signer
    pub fn verify(&self, key: &str, query: &SignedQuery, now: DateTime<Utc>) -> Result<i64, SignatureError> {
        verify_link(self.signer.as_ref(), key, query, now)
    }
}
