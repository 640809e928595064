//! SHA-256 content hashing.
//!
//! Manifest digests are standard base64 of the raw 32-byte hash, which is the
//! encoding the marketplace uses in `.signature.manifest`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

/// Raw SHA-256 of an in-memory buffer.
pub fn sha256(bytes: &[u8]) -> Vec<u8> {
    Sha256::digest(bytes).to_vec()
}

/// SHA-256 of `bytes`, base64 encoded (manifest format).
pub fn sha256_base64(bytes: &[u8]) -> String {
    BASE64.encode(sha256(bytes))
}

/// SHA-256 of `bytes`, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}
