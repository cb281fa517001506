use super::Code;
use crate::attributes::Attribute;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Invalid packet length: {0}")]
    InvalidLength(usize),
    #[error("Invalid packet code: {0}")]
    InvalidCode(u8),
    #[error("Attribute error: {0}")]
    AttributeError(String),
    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// RADIUS packet (RFC 2865 Section 3)
///
/// ```text
/// |     Code      |  Identifier   |            Length             |
/// |                         Authenticator (16)                    |
/// |  Attributes ...
/// ```
#[derive(Debug, Clone)]
pub struct Packet {
    pub code: Code,
    /// Identifier matching requests to responses
    pub identifier: u8,
    /// Request or Response Authenticator
    pub authenticator: [u8; 16],
    pub attributes: Vec<Attribute>,
}

impl Packet {
    /// Fixed header size: code + identifier + length + authenticator
    pub const HEADER_SIZE: usize = 20;
    /// Maximum packet size per RFC 2865
    pub const MAX_PACKET_SIZE: usize = 4096;

    pub fn new(code: Code, identifier: u8, authenticator: [u8; 16]) -> Self {
        Packet {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Length of the encoded packet
    pub fn length(&self) -> usize {
        Self::HEADER_SIZE
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_length)
                .sum::<usize>()
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let total = self.length();
        if total > Self::MAX_PACKET_SIZE {
            return Err(PacketError::PacketTooLarge(total));
        }

        let mut buffer = Vec::with_capacity(total);
        buffer.push(self.code.as_u8());
        buffer.push(self.identifier);
        buffer.extend_from_slice(&(total as u16).to_be_bytes());
        buffer.extend_from_slice(&self.authenticator);
        for attr in &self.attributes {
            attr.encode_into(&mut buffer)?;
        }
        Ok(buffer)
    }

    /// Decode from wire bytes
    ///
    /// Trailing bytes past the declared length are ignored, as required by
    /// RFC 2865 Section 3.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::HEADER_SIZE {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let code = Code::from_u8(data[0]).ok_or(PacketError::InvalidCode(data[0]))?;
        let identifier = data[1];
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;

        if length < Self::HEADER_SIZE || length > Self::MAX_PACKET_SIZE || data.len() < length {
            return Err(PacketError::InvalidLength(length));
        }

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&data[4..20]);

        let mut attributes = Vec::new();
        let mut rest = &data[Self::HEADER_SIZE..length];
        while !rest.is_empty() {
            let attr = Attribute::decode(rest)?;
            rest = &rest[attr.encoded_length()..];
            attributes.push(attr);
        }

        Ok(Packet {
            code,
            identifier,
            authenticator,
            attributes,
        })
    }

    /// First attribute of the given type, if any
    pub fn find_attribute(&self, attr_type: u8) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.attr_type == attr_type)
    }

    /// First attribute of the given type decoded as UTF-8, if any
    pub fn find_string(&self, attr_type: u8) -> Option<String> {
        self.find_attribute(attr_type).and_then(|a| a.as_string().ok())
    }
}
