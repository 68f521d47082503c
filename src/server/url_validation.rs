use crate::error::AppError;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Check that a caller-supplied relay URL is safe to fetch.
///
/// Only absolute `http`/`https` URLs are relayed. Unless `allow_private` is
/// set, loopback, private, link-local and unspecified IP literals are refused,
/// as is the `localhost` name. Other hostnames are not resolved, so DNS
/// rebinding is not covered.
///
/// # Errors
/// [`AppError::InvalidRelayUrl`] describing the rejected part.
pub fn validate_relay_url(raw: &str, allow_private: bool) -> Result<Url, AppError> {
    let parsed =
        Url::parse(raw).map_err(|_| AppError::InvalidRelayUrl(format!("not a URL: {raw}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::InvalidRelayUrl(format!(
            "scheme '{}' not allowed",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host()
        .ok_or_else(|| AppError::InvalidRelayUrl(format!("no host in {raw}")))?;

    if !allow_private {
        let blocked = match &host {
            Host::Ipv4(ip) => is_internal_v4(*ip),
            Host::Ipv6(ip) => is_internal_v6(*ip),
            Host::Domain(name) => name.eq_ignore_ascii_case("localhost"),
        };
        if blocked {
            return Err(AppError::InvalidRelayUrl(format!(
                "internal address not allowed: {host}"
            )));
        }
    }

    Ok(parsed)
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.octets()[0] == 0
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xffc0) == 0xfe80 // link-local
        || (first & 0xfe00) == 0xfc00 // unique-local
        || ip.to_ipv4_mapped().is_some_and(is_internal_v4)
}
