//! Accounting packet interpretation
//!
//! Accounting only feeds liveness: the online flag, last seen location, and
//! last IPv4. It never influences authentication decisions, and failures
//! here are logged and dropped rather than surfaced to the NAS.

use crate::repo::{IdentityRepository, Liveness, RepoError};
use hotspot_proto::attributes::{AttributeType, WISPR_LOCATION_NAME, WISPR_VENDOR_ID};
use hotspot_proto::{AcctStatusType, Packet};
use tracing::debug;

/// Pull the WISPr location name out of the request's vendor attributes
fn location_name(request: &Packet) -> Option<String> {
    request.attributes.iter().find_map(|attr| {
        attr.vendor_value(WISPR_VENDOR_ID, WISPR_LOCATION_NAME)
            .and_then(|value| String::from_utf8(value.to_vec()).ok())
    })
}

fn framed_ipv4(request: &Packet) -> Option<String> {
    let attr = request.find_attribute(AttributeType::FramedIpAddress as u8)?;
    let octets: [u8; 4] = attr.value.as_slice().try_into().ok()?;
    Some(std::net::Ipv4Addr::from(octets).to_string())
}

/// Apply an Accounting-Request to the identity store
///
/// Start and Interim-Update mark the device online, Stop marks it offline;
/// NAS status types (Accounting-On/Off) carry no device and are ignored.
/// Unknown MACs are a silent no-op.
pub async fn apply_accounting(
    repo: &dyn IdentityRepository,
    request: &Packet,
) -> Result<(), RepoError> {
    let Some(mac) = request.find_string(AttributeType::CallingStationId as u8) else {
        debug!("Accounting request without Calling-Station-Id");
        return Ok(());
    };

    let status = request
        .find_attribute(AttributeType::AcctStatusType as u8)
        .and_then(|attr| attr.as_integer().ok())
        .and_then(AcctStatusType::from_u32);

    let Some(status) = status.filter(|s| s.is_session_status()) else {
        return Ok(());
    };

    let liveness = Liveness {
        online: !matches!(status, AcctStatusType::Stop),
        location: location_name(request),
        ipv4: framed_ipv4(request),
    };

    debug!(
        mac = %crate::phone::mask_mac(&mac),
        status = ?status,
        online = liveness.online,
        "Accounting liveness update"
    );
    repo.update_liveness(&mac, liveness).await
}
