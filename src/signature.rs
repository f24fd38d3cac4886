//! Request body signatures
//!
//! Agent and server may share a secret key. The agent then sends
//! `hex(HMAC-SHA256(key, body))` in the [`SIGNATURE_HEADER`] header and the
//! server rejects update requests whose signature does not match.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the hex-encoded body signature
pub const SIGNATURE_HEADER: &str = "HashSHA256";

type HmacSha256 = Hmac<Sha256>;

/// Shared secret, ready to sign and verify bodies
#[derive(Clone)]
pub struct SignatureKey {
    mac: HmacSha256,
}

impl SignatureKey {
    pub fn new(key: &str) -> Result<Self, SignatureError> {
        if key.is_empty() {
            return Err(SignatureError::EmptyKey);
        }

        let mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|_| SignatureError::InvalidKey)?;

        Ok(Self { mac })
    }

    /// Key from optional configuration; an empty string means no key
    pub fn from_config(key: Option<&str>) -> Result<Option<Self>, SignatureError> {
        key.filter(|key| !key.is_empty()).map(Self::new).transpose()
    }

    /// Hex-encoded signature of `body`
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check a hex-encoded signature in constant time
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };

        let mut mac = self.mac.clone();
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignatureKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    EmptyKey,
    InvalidKey,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::EmptyKey => write!(f, "signature key must not be empty"),
            SignatureError::InvalidKey => write!(f, "signature key is not usable for HMAC"),
        }
    }
}

impl std::error::Error for SignatureError {}
