//! Device fingerprinting
//!
//! A returning phone on a fresh randomized MAC is re-identified by hashing
//! the client-supplied hardware fingerprint together with the phone number.
//! The hash is advisory only: identity is still gated on the stored phone
//! matching, so a collision can never authorize a different subscriber.

use sha2::{Digest, Sha256};

/// SHA-256 over `hardware_fp:phone`, lowercase hex
///
/// Returns `None` when the client supplied no stable identifier; without
/// one, fingerprint matching is skipped entirely rather than risking
/// false positives.
pub fn fingerprint(phone: &str, hardware_fp: Option<&str>) -> Option<String> {
    let hardware_fp = hardware_fp.filter(|fp| !fp.is_empty())?;

    let mut hasher = Sha256::new();
    hasher.update(hardware_fp.as_bytes());
    hasher.update(b":");
    hasher.update(phone.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            fingerprint("79999999999", Some("0123456789abcdef")).as_deref(),
            Some("e627ce00cc456a84bf2a2071bad08db1ba48fcb8bd6865a0346c6f9ea94c7002")
        );
    }

    #[test]
    fn no_hardware_fp_no_hash() {
        assert_eq!(fingerprint("79999999999", None), None);
        assert_eq!(fingerprint("79999999999", Some("")), None);
    }

    #[test]
    fn order_sensitive() {
        let a = fingerprint("111", Some("222"));
        let b = fingerprint("222", Some("111"));
        assert_ne!(a, b);
    }
}
