mod attribute;
mod types;

pub use attribute::Attribute;
pub use types::{
    AttributeType, MIKROTIK_GROUP, MIKROTIK_VENDOR_ID, WISPR_LOCATION_NAME, WISPR_VENDOR_ID,
};
