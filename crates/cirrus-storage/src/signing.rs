//! Time-limited signed URLs for private objects.
//!
//! A signed URL carries the storage key, an expiry timestamp, and an
//! HMAC-SHA256 over both. Possession of a valid signature is the only
//! credential needed to download, which is what lets a browser fetch the
//! object directly without a bearer token.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs storage keys and verifies download requests.
pub struct UrlSigner {
    secret: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// Path + query, relative to the server base URL.
    pub path_and_query: String,
    pub expires_at: i64,
}

impl UrlSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn signature(&self, key: &str, expires_at: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_at.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Produce a signed download path valid for `ttl_seconds` from `now`.
    pub fn create_signed_url(&self, key: &str, ttl_seconds: u64, now: i64) -> SignedUrl {
        let expires_at = now + ttl_seconds as i64;
        let sig = self.signature(key, expires_at);
        SignedUrl {
            path_and_query: format!("/download/{}?expires={}&sig={}", key, expires_at, sig),
            expires_at,
        }
    }

    /// Check a download request's signature and expiry.
    pub fn verify(&self, key: &str, expires_at: i64, sig: &str, now: i64) -> bool {
        if now > expires_at {
            return false;
        }
        // Constant-time comparison via the hmac crate, not string equality
        let Ok(sig_bytes) = hex::decode(sig) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_at.to_string().as_bytes());
        mac.verify_slice(&sig_bytes).is_ok()
    }
}
