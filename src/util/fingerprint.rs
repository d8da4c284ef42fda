//! Short, log-safe fingerprints of secrets.

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// First 12 hex characters of the SHA-256 of `secret`.
///
/// Device codes are bearer-like secrets, so logs carry this instead.
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut out = String::with_capacity(12);
    for byte in digest.iter().take(6) {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
