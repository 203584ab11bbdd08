//! URL signing for media links.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and checks opaque payloads.
///
/// Implementations must be deterministic for a given secret, so a media host
/// holding the same secret can verify links without talking to the issuer.
pub trait UrlSigner: Send + Sync {
    /// Signature for `payload`, in a URL-safe text form
    fn sign(&self, payload: &str) -> String;

    /// Whether `signature` was produced by [`UrlSigner::sign`] for `payload`
    fn verify(&self, payload: &str, signature: &str) -> bool;
}

/// HMAC-SHA256 signer producing lowercase hex signatures
pub struct HmacUrlSigner {
    secret: Vec<u8>,
}

impl HmacUrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        // HMAC accepts keys of any length, the error case cannot occur
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC accepts any key length"),
        };
        mac.update(payload.as_bytes());
        mac
    }
}

impl UrlSigner for HmacUrlSigner {
    fn sign(&self, payload: &str) -> String {
        hex::encode(self.mac(payload).finalize().into_bytes())
    }

    fn verify(&self, payload: &str, signature: &str) -> bool {
        let Ok(bytes) = hex::decode(signature) else {
            return false;
        };
        // Constant-time comparison
        self.mac(payload).verify_slice(&bytes).is_ok()
    }
}

impl std::fmt::Debug for HmacUrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacUrlSigner").finish_non_exhaustive()
    }
}

/// Generate a random signing secret (used when none is configured)
pub fn random_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}
