//! Request fingerprinting for hash-suffixed recording names

use hyper::header::HeaderMap;
use sha2::{Digest, Sha256};

/// Headers that take part in the fingerprint, in hashing order
pub const FINGERPRINT_HEADERS: [&str; 3] = ["accept", "if-match", "user-agent"];

/// Number of hash bytes used in file name suffixes
pub const SUFFIX_BYTES: usize = 8;

/// Compute SHA-256 fingerprint of a request
///
/// The fingerprint includes:
/// 1. Body
/// 2. The first value of each of [`FINGERPRINT_HEADERS`] that is present
///
/// Method and path are already part of the file name and are left out.
#[must_use]
pub fn fingerprint_request(headers: &HeaderMap, body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();

    // 1. Body
    hasher.update((body.len() as u32).to_le_bytes());
    hasher.update(body);

    // 2. Selected headers (first value only)
    for name in FINGERPRINT_HEADERS {
        if let Some(value) = headers.get(name) {
            let value = value.as_bytes();
            hasher.update((name.len() as u32).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update((value.len() as u32).to_le_bytes());
            hasher.update(value);
        }
    }

    hasher.finalize().into()
}

/// Hex file name suffix for a fingerprint
#[must_use]
pub fn fingerprint_suffix(hash: &[u8; 32]) -> String {
    hex::encode(&hash[..SUFFIX_BYTES])
}
