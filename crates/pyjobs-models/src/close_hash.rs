//! Close-link authorization for job postings.
//!
//! A job's close hash is an HMAC-SHA256 of its slug under the server secret.
//! It is never stored: verification recomputes it from the slug, so a hash
//! is valid only for the exact slug it was derived from.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ModelError, ModelResult};

type HmacSha256 = Hmac<Sha256>;

const CLOSE_CONTEXT: &[u8] = b"close:";

/// Derives and checks close hashes.
#[derive(Clone)]
pub struct CloseHasher {
    mac: HmacSha256,
}

impl std::fmt::Debug for CloseHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHasher").finish_non_exhaustive()
    }
}

impl CloseHasher {
    /// Create a hasher keyed with the server secret.
    pub fn new(secret: &str) -> ModelResult<Self> {
        if secret.is_empty() {
            return Err(ModelError::InvalidKey("secret must not be empty".to_string()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ModelError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    fn keyed(&self, slug: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(CLOSE_CONTEXT);
        mac.update(slug.as_bytes());
        mac
    }

    /// Close hash for `slug`, URL-safe base64 without padding.
    pub fn hash(&self, slug: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.keyed(slug).finalize().into_bytes())
    }

    /// Check `candidate` against the hash recomputed for `slug`.
    ///
    /// Decoding is strict, so non-canonical encodings of the right bytes are rejected
    /// and every single-character change fails. The MAC comparison is constant-time.
    pub fn verify(&self, slug: &str, candidate: &str) -> bool {
        let Ok(bytes) = URL_SAFE_NO_PAD.decode(candidate) else {
            return false;
        };
        self.keyed(slug).verify_slice(&bytes).is_ok()
    }
}
