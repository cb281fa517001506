use crate::packet::PacketError;
use super::types::AttributeType;

/// RADIUS attribute (RFC 2865 Section 5)
///
/// ```text
/// |     Type      |    Length     |  Value ...
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: u8,
    pub value: Vec<u8>,
}

impl Attribute {
    /// Type and length fields
    pub const MIN_LENGTH: usize = 2;
    /// Maximum encoded length including type and length fields
    pub const MAX_LENGTH: usize = 255;
    /// Maximum value length
    pub const MAX_VALUE_LENGTH: usize = 253;

    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute value too long: {} bytes (max {})",
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(Attribute { attr_type, value })
    }

    /// Text attribute
    pub fn string(attr_type: u8, value: impl Into<String>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// 32-bit big-endian integer attribute
    pub fn integer(attr_type: u8, value: u32) -> Result<Self, PacketError> {
        Self::new(attr_type, value.to_be_bytes().to_vec())
    }

    /// Vendor-Specific attribute wrapping a single sub-attribute
    /// (RFC 2865 Section 5.26 layout: vendor id, then type/length/value)
    pub fn vendor(vendor_id: u32, vendor_type: u8, value: &[u8]) -> Result<Self, PacketError> {
        let mut payload = Vec::with_capacity(6 + value.len());
        payload.extend_from_slice(&vendor_id.to_be_bytes());
        payload.push(vendor_type);
        payload.push((value.len() + 2) as u8);
        payload.extend_from_slice(value);
        Self::new(AttributeType::VendorSpecific as u8, payload)
    }

    pub(crate) fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        let length = self.encoded_length();
        if length > Self::MAX_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Encoded attribute too long: {} bytes",
                length
            )));
        }
        buffer.push(self.attr_type);
        buffer.push(length as u8);
        buffer.extend_from_slice(&self.value);
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut buffer = Vec::with_capacity(self.encoded_length());
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute data too short: {} bytes",
                data.len()
            )));
        }

        let attr_type = data[0];
        let length = data[1] as usize;
        if length < Self::MIN_LENGTH || length > data.len() {
            return Err(PacketError::AttributeError(format!(
                "Invalid attribute length: {}",
                length
            )));
        }

        Ok(Attribute {
            attr_type,
            value: data[Self::MIN_LENGTH..length].to_vec(),
        })
    }

    pub fn encoded_length(&self) -> usize {
        Self::MIN_LENGTH + self.value.len()
    }

    pub fn as_string(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.value.clone())
    }

    pub fn as_integer(&self) -> Result<u32, PacketError> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().map_err(|_| {
            PacketError::AttributeError(format!(
                "Expected 4 bytes for integer, got {}",
                self.value.len()
            ))
        })?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Sub-attribute value if this is a Vendor-Specific attribute of the
    /// given vendor and type
    pub fn vendor_value(&self, vendor_id: u32, vendor_type: u8) -> Option<&[u8]> {
        if self.attr_type != AttributeType::VendorSpecific as u8 || self.value.len() < 6 {
            return None;
        }
        let id = u32::from_be_bytes([self.value[0], self.value[1], self.value[2], self.value[3]]);
        if id != vendor_id {
            return None;
        }
        // Walk the vendor sub-attributes; most NAS vendors only pack one.
        let mut rest = &self.value[4..];
        while rest.len() >= 2 {
            let vtype = rest[0];
            let vlen = rest[1] as usize;
            if vlen < 2 || vlen > rest.len() {
                return None;
            }
            if vtype == vendor_type {
                return Some(&rest[2..vlen]);
            }
            rest = &rest[vlen..];
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{MIKROTIK_VENDOR_ID, WISPR_LOCATION_NAME, WISPR_VENDOR_ID};

    #[test]
    fn string_attribute() {
        let attr = Attribute::string(1, "guest").unwrap();
        assert_eq!(attr.attr_type, 1);
        assert_eq!(attr.as_string().unwrap(), "guest");
    }

    #[test]
    fn integer_attribute() {
        let attr = Attribute::integer(40, 2).unwrap();
        assert_eq!(attr.as_integer().unwrap(), 2);
    }

    #[test]
    fn encode_decode_round_trip() {
        let attr = Attribute::string(31, "AA:BB:CC:DD:EE:FF").unwrap();
        let bytes = attr.encode().unwrap();
        assert_eq!(Attribute::decode(&bytes).unwrap(), attr);
    }

    #[test]
    fn oversized_value_rejected() {
        assert!(Attribute::new(1, vec![0u8; 254]).is_err());
    }

    #[test]
    fn vendor_attribute_round_trip() {
        let attr = Attribute::vendor(MIKROTIK_VENDOR_ID, 3, b"employee").unwrap();
        assert_eq!(
            attr.vendor_value(MIKROTIK_VENDOR_ID, 3),
            Some(b"employee".as_slice())
        );
        // Wrong vendor or sub-type finds nothing
        assert_eq!(attr.vendor_value(WISPR_VENDOR_ID, 3), None);
        assert_eq!(attr.vendor_value(MIKROTIK_VENDOR_ID, WISPR_LOCATION_NAME), None);
    }

    #[test]
    fn vendor_value_ignores_non_vsa() {
        let attr = Attribute::string(1, "guest").unwrap();
        assert_eq!(attr.vendor_value(MIKROTIK_VENDOR_ID, 3), None);
    }
}
