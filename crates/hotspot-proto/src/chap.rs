//! CHAP arithmetic shared by the RADIUS server and the captive portal
//! (RFC 2865 Section 5.3).
//!
//! The hotspot router hands CHAP-ID and CHAP-Challenge to the walled-garden
//! login page as backslash-octal-escaped strings (`\NNN` per byte); the
//! portal variant below decodes that encoding before hashing.

/// Decode a backslash-octal-escaped string (`\101\102` -> `AB`)
///
/// Groups that do not parse as octal are skipped rather than failing the
/// whole field; a mangled challenge then simply never verifies.
pub fn decode_octal(escaped: &str) -> Vec<u8> {
    escaped
        .split('\\')
        .skip(1)
        .filter_map(|group| u8::from_str_radix(group, 8).ok())
        .collect()
}

/// CHAP-Password attribute payload: one identifier byte plus the 16-byte
/// MD5 response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapResponse {
    pub ident: u8,
    pub digest: [u8; 16],
}

impl ChapResponse {
    /// Parse the 17-byte CHAP-Password attribute value
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (ident, digest) = bytes.split_first()?;
        let digest: [u8; 16] = digest.try_into().ok()?;
        Some(ChapResponse {
            ident: *ident,
            digest,
        })
    }
}

/// MD5(ident + password + challenge), the expected CHAP response
pub fn compute_chap(ident: u8, password: &str, challenge: &[u8]) -> [u8; 16] {
    let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
    data.push(ident);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(challenge);
    md5::compute(&data).0
}

/// Verify a raw CHAP-Password attribute value against an expected password
///
/// Malformed blobs (wrong length) fail verification instead of erroring.
pub fn verify_chap_blob(chap_password: &[u8], challenge: &[u8], expected_password: &str) -> bool {
    match ChapResponse::from_bytes(chap_password) {
        Some(response) => {
            compute_chap(response.ident, expected_password, challenge) == response.digest
        }
        None => false,
    }
}

/// Portal-side CHAP hash: the password a device must submit to the router's
/// walled-garden login when the router runs CHAP
///
/// `chap_id` and `chap_challenge` arrive octal-escaped from the router's
/// redirect; the result is the lowercase hex MD5 digest.
pub fn portal_chap_hash(chap_id: &str, password: &str, chap_challenge: &str) -> String {
    let mut data = decode_octal(chap_id);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(&decode_octal(chap_challenge));
    hex::encode(md5::compute(&data).0)
}
