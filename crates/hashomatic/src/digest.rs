//! One-way digest applied to submitted secrets.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha512};

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("Digest failed: {0}")]
    Failed(String),
}

/// Pure, deterministic `secret -> string` transform run by completion workers.
pub trait Digester: Send + Sync {
    fn digest(&self, secret: &str) -> Result<String, DigestError>;
}

/// SHA-512 of the secret bytes, base64 encoded with the standard alphabet and padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512Base64;

impl Digester for Sha512Base64 {
    fn digest(&self, secret: &str) -> Result<String, DigestError> {
        Ok(digest_secret(secret))
    }
}

pub fn digest_secret(secret: &str) -> String {
    let sum = Sha512::digest(secret.as_bytes());
    STANDARD.encode(sum)
}
