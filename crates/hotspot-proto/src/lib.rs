//! RADIUS wire protocol support for the hotspot AAA backend.
//!
//! This crate implements the subset of RFC 2865/2866/2869 the venue hotspot
//! actually speaks: Access-Request/Accept/Reject, Accounting, and
//! Disconnect/CoA acknowledgement, plus the CHAP and Message-Authenticator
//! arithmetic shared with the captive-portal login flow.
//!
//! # Example
//!
//! ```rust
//! use hotspot_proto::{Attribute, AttributeType, Code, Packet};
//! use hotspot_proto::auth::generate_request_authenticator;
//! use hotspot_proto::message_auth::sign_request;
//!
//! let mut request = Packet::new(Code::AccessRequest, 7, generate_request_authenticator());
//! request.add_attribute(Attribute::string(AttributeType::UserName as u8, "79990000001").unwrap());
//! sign_request(&mut request, b"secret").unwrap();
//! let bytes = request.encode().unwrap();
//! assert!(Packet::decode(&bytes).is_ok());
//! ```

pub mod accounting;
pub mod attributes;
pub mod auth;
pub mod chap;
pub mod message_auth;
pub mod packet;

pub use accounting::AcctStatusType;
pub use attributes::{Attribute, AttributeType, MIKROTIK_VENDOR_ID, WISPR_VENDOR_ID};
pub use auth::{
    calculate_accounting_request_authenticator, calculate_response_authenticator,
    decrypt_user_password, encrypt_user_password, generate_request_authenticator,
    verify_accounting_request_authenticator,
};
pub use chap::{decode_octal, portal_chap_hash, verify_chap_blob, ChapResponse};
pub use message_auth::{sign_reply, sign_request, verify_request_message_authenticator};
pub use packet::{Code, Packet, PacketError};
