use crate::packet::{Packet, PacketError};
use rand::Rng;

/// Generate a random Request Authenticator (RFC 2865 Section 3)
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

fn header_and_attributes(packet: &Packet, authenticator: &[u8; 16]) -> Result<Vec<u8>, PacketError> {
    let mut data = Vec::with_capacity(packet.length());
    data.push(packet.code.as_u8());
    data.push(packet.identifier);
    data.extend_from_slice(&(packet.length() as u16).to_be_bytes());
    data.extend_from_slice(authenticator);
    for attr in &packet.attributes {
        data.extend_from_slice(&attr.encode()?);
    }
    Ok(data)
}

fn md5_16(data: &[u8]) -> [u8; 16] {
    md5::compute(data).0
}

/// Response Authenticator (RFC 2865 Section 3):
/// MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
pub fn calculate_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let mut data = header_and_attributes(response, request_authenticator)?;
    data.extend_from_slice(secret);
    Ok(md5_16(&data))
}

/// Accounting Request Authenticator (RFC 2866 Section 3):
/// same construction with a zeroed authenticator field
pub fn calculate_accounting_request_authenticator(
    request: &Packet,
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let mut data = header_and_attributes(request, &[0u8; 16])?;
    data.extend_from_slice(secret);
    Ok(md5_16(&data))
}

/// Check the authenticator a NAS stamped on an Accounting-Request
pub fn verify_accounting_request_authenticator(request: &Packet, secret: &[u8]) -> bool {
    match calculate_accounting_request_authenticator(request, secret) {
        Ok(expected) => expected == request.authenticator,
        Err(_) => false,
    }
}

/// Encrypt User-Password (RFC 2865 Section 5.2)
///
/// The password is null-padded to a 16-byte multiple and each block is
/// XORed with MD5(secret + previous block), seeded with the Request
/// Authenticator.
pub fn encrypt_user_password(password: &str, secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    let mut padded = password.as_bytes().to_vec();
    let target = padded.len().div_ceil(16).max(1) * 16;
    padded.resize(target, 0);

    let mut result = Vec::with_capacity(padded.len());
    let mut previous: Vec<u8> = authenticator.to_vec();

    for chunk in padded.chunks(16) {
        let mut seed = secret.to_vec();
        seed.extend_from_slice(&previous);
        let hash = md5_16(&seed);

        let block: Vec<u8> = chunk.iter().zip(hash.iter()).map(|(c, h)| c ^ h).collect();
        previous = block.clone();
        result.extend_from_slice(&block);
    }

    result
}

/// Decrypt User-Password (RFC 2865 Section 5.2)
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, PacketError> {
    if encrypted.is_empty() || encrypted.len() % 16 != 0 {
        return Err(PacketError::AttributeError(format!(
            "Invalid User-Password length: {}",
            encrypted.len()
        )));
    }

    let mut result = Vec::with_capacity(encrypted.len());
    let mut previous: &[u8] = authenticator;

    for chunk in encrypted.chunks(16) {
        let mut seed = secret.to_vec();
        seed.extend_from_slice(previous);
        let hash = md5_16(&seed);

        result.extend(chunk.iter().zip(hash.iter()).map(|(c, h)| c ^ h));
        previous = chunk;
    }

    while result.last() == Some(&0) {
        result.pop();
    }

    String::from_utf8(result)
        .map_err(|e| PacketError::AttributeError(format!("Invalid UTF-8 in password: {}", e)))
}
