//! Accounting status types (RFC 2866 Section 5.1)

/// Acct-Status-Type values the hotspot reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AcctStatusType {
    /// Start (1) - session began
    Start = 1,
    /// Stop (2) - session ended
    Stop = 2,
    /// Interim-Update (3) - periodic refresh during a session
    InterimUpdate = 3,
    /// Accounting-On (7) - NAS came up
    AccountingOn = 7,
    /// Accounting-Off (8) - NAS going down
    AccountingOff = 8,
}

impl AcctStatusType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(AcctStatusType::Start),
            2 => Some(AcctStatusType::Stop),
            3 => Some(AcctStatusType::InterimUpdate),
            7 => Some(AcctStatusType::AccountingOn),
            8 => Some(AcctStatusType::AccountingOff),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Status types that describe a device session rather than the NAS
    pub fn is_session_status(self) -> bool {
        matches!(
            self,
            AcctStatusType::Start | AcctStatusType::Stop | AcctStatusType::InterimUpdate
        )
    }
}
