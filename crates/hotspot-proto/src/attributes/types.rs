/// RADIUS attribute types consumed or emitted by the hotspot backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1) - RFC 2865
    UserName = 1,
    /// User-Password (2) - RFC 2865
    UserPassword = 2,
    /// CHAP-Password (3) - RFC 2865
    ChapPassword = 3,
    /// NAS-IP-Address (4) - RFC 2865
    NasIpAddress = 4,
    /// Framed-IP-Address (8) - RFC 2865
    FramedIpAddress = 8,
    /// Reply-Message (18) - RFC 2865
    ReplyMessage = 18,
    /// Vendor-Specific (26) - RFC 2865
    VendorSpecific = 26,
    /// Called-Station-Id (30) - RFC 2865
    CalledStationId = 30,
    /// Calling-Station-Id (31) - RFC 2865
    CallingStationId = 31,
    /// NAS-Identifier (32) - RFC 2865
    NasIdentifier = 32,
    /// Acct-Status-Type (40) - RFC 2866
    AcctStatusType = 40,
    /// Acct-Session-Id (44) - RFC 2866
    AcctSessionId = 44,
    /// CHAP-Challenge (60) - RFC 2865
    ChapChallenge = 60,
    /// Message-Authenticator (80) - RFC 2869
    MessageAuthenticator = 80,
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AttributeType::UserName),
            2 => Some(AttributeType::UserPassword),
            3 => Some(AttributeType::ChapPassword),
            4 => Some(AttributeType::NasIpAddress),
            8 => Some(AttributeType::FramedIpAddress),
            18 => Some(AttributeType::ReplyMessage),
            26 => Some(AttributeType::VendorSpecific),
            30 => Some(AttributeType::CalledStationId),
            31 => Some(AttributeType::CallingStationId),
            32 => Some(AttributeType::NasIdentifier),
            40 => Some(AttributeType::AcctStatusType),
            44 => Some(AttributeType::AcctSessionId),
            60 => Some(AttributeType::ChapChallenge),
            80 => Some(AttributeType::MessageAuthenticator),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Mikrotik private enterprise number; Mikrotik-Group rides on it
pub const MIKROTIK_VENDOR_ID: u32 = 14988;

/// Mikrotik-Group vendor type, the employee/guest class marker on Accept
pub const MIKROTIK_GROUP: u8 = 3;

/// WISPr (Wi-Fi Alliance) private enterprise number
pub const WISPR_VENDOR_ID: u32 = 14122;

/// WISPr-Location-Name vendor type
pub const WISPR_LOCATION_NAME: u8 = 2;
