//! REST API keys.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix of every issued key, so leaked keys are easy to spot.
pub const API_KEY_PREFIX: &str = "pyj_";

/// A stored API key. Only the digest of the raw key is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub label: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Generate a new raw API key (256 random bits from two v4 UUIDs).
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    format!("{}{}", API_KEY_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

/// Digest under which a raw key is stored and looked up.
pub fn digest_api_key(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(raw.as_bytes()))
}
