//! Message-Authenticator attribute (RFC 2869 Section 5.14)
//!
//! HMAC-MD5 over the whole packet with the Message-Authenticator value
//! zeroed. Requests are hashed with their own Request Authenticator in
//! place; replies are hashed with the *request's* authenticator before the
//! Response Authenticator is stamped.

use crate::attributes::{Attribute, AttributeType};
use crate::auth::calculate_response_authenticator;
use crate::packet::{Packet, PacketError};
use hmac::{Hmac, Mac};
use md5_digest::Md5;

type HmacMd5 = Hmac<Md5>;

const VALUE_LEN: usize = 16;

/// HMAC-MD5 over packet bytes with the shared secret
pub fn calculate_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(packet_bytes);
    let mut output = [0u8; 16];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// Byte offset of the Message-Authenticator value within a raw packet
fn find_authenticator_offset(packet_bytes: &[u8]) -> Option<usize> {
    if packet_bytes.len() < Packet::HEADER_SIZE {
        return None;
    }
    let length =
        (u16::from_be_bytes([packet_bytes[2], packet_bytes[3]]) as usize).min(packet_bytes.len());

    let mut offset = Packet::HEADER_SIZE;
    while offset + 2 <= length {
        let attr_type = packet_bytes[offset];
        let attr_len = packet_bytes[offset + 1] as usize;
        if attr_len < 2 || offset + attr_len > length {
            return None;
        }
        if attr_type == AttributeType::MessageAuthenticator as u8 && attr_len == VALUE_LEN + 2 {
            return Some(offset + 2);
        }
        offset += attr_len;
    }
    None
}

/// Verify the Message-Authenticator on an inbound request
///
/// Absent or malformed attributes fail verification; spoofed packets must
/// not reach account lookups.
pub fn verify_request_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> bool {
    let Some(offset) = find_authenticator_offset(packet_bytes) else {
        return false;
    };

    let mut zeroed = packet_bytes.to_vec();
    zeroed[offset..offset + VALUE_LEN].fill(0);

    let expected = calculate_message_authenticator(&zeroed, secret);
    packet_bytes[offset..offset + VALUE_LEN] == expected
}

/// Verify the Message-Authenticator on a reply, given the matching
/// request's authenticator
pub fn verify_reply_message_authenticator(
    packet_bytes: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    let Some(offset) = find_authenticator_offset(packet_bytes) else {
        return false;
    };

    let mut shadow = packet_bytes.to_vec();
    shadow[4..20].copy_from_slice(request_authenticator);
    shadow[offset..offset + VALUE_LEN].fill(0);

    let expected = calculate_message_authenticator(&shadow, secret);
    packet_bytes[offset..offset + VALUE_LEN] == expected
}

fn append_and_fill(packet: &mut Packet, digest: [u8; 16]) {
    if let Some(attr) = packet.attributes.last_mut() {
        attr.value = digest.to_vec();
    }
}

/// Append a valid Message-Authenticator to an outbound request
pub fn sign_request(request: &mut Packet, secret: &[u8]) -> Result<(), PacketError> {
    request.add_attribute(Attribute::new(
        AttributeType::MessageAuthenticator as u8,
        vec![0u8; VALUE_LEN],
    )?);
    let bytes = request.encode()?;
    append_and_fill(request, calculate_message_authenticator(&bytes, secret));
    Ok(())
}

/// Append a Message-Authenticator to a reply and stamp its Response
/// Authenticator, in that order (RFC 2869 requires the MAC to be computed
/// before the Response Authenticator)
pub fn sign_reply(
    reply: &mut Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<(), PacketError> {
    reply.add_attribute(Attribute::new(
        AttributeType::MessageAuthenticator as u8,
        vec![0u8; VALUE_LEN],
    )?);

    let mut shadow = reply.clone();
    shadow.authenticator = *request_authenticator;
    let bytes = shadow.encode()?;
    append_and_fill(reply, calculate_message_authenticator(&bytes, secret));

    reply.authenticator = calculate_response_authenticator(reply, request_authenticator, secret)?;
    Ok(())
}
