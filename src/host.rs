//! Canonicalization of request hosts and paths.

use crate::error::Error;
use std::net::{IpAddr, Ipv6Addr};

/// Produce the canonical form of a request host: lowercased, port and
/// trailing dot stripped, non-ASCII labels IDNA-encoded. IP literals pass
/// through, with IPv6 addresses normalized to their unbracketed lowercase
/// form.
pub(crate) fn canonical_host(host: &str) -> Result<String, Error> {
    if host.is_empty() {
        return Err(Error::MalformedHost);
    }

    let host = strip_port(host)?;

    if let Some(rest) = host.strip_prefix('[') {
        let addr = rest.strip_suffix(']').ok_or(Error::MalformedHost)?;
        let addr: Ipv6Addr = addr.parse().map_err(|_| Error::MalformedHost)?;
        return Ok(addr.to_string());
    }

    // An IPv6 literal that never had brackets to begin with.
    if let Ok(addr) = host.parse::<Ipv6Addr>() {
        return Ok(addr.to_string());
    }

    let host = host.strip_suffix('.').unwrap_or(host);

    match url::Host::parse(host) {
        Ok(url::Host::Domain(domain)) => Ok(domain),
        Ok(url::Host::Ipv4(addr)) => Ok(addr.to_string()),
        Ok(url::Host::Ipv6(addr)) => Ok(addr.to_string()),
        Err(_) => Err(Error::MalformedHost),
    }
}

/// Remove a `:port` suffix, if present. An opening IPv6 bracket without its
/// closing partner is rejected.
fn strip_port(host: &str) -> Result<&str, Error> {
    if host.starts_with('[') {
        let end = host.find(']').ok_or(Error::MalformedHost)?;
        match &host[end + 1..] {
            "" => Ok(host),
            port if port.starts_with(':') => Ok(&host[..=end]),
            _ => Err(Error::MalformedHost),
        }
    } else if host.contains(']') {
        Err(Error::MalformedHost)
    } else {
        match host.matches(':').count() {
            0 => Ok(host),
            1 => Ok(&host[..host.find(':').unwrap()]),
            // More than one colon without brackets is a bare IPv6
            // address, which carries no port.
            _ => Ok(host),
        }
    }
}

/// Compute the directory of the request path per RFC 6265 section 5.1.4,
/// used when a cookie carries no `Path` attribute.
pub(crate) fn default_path(path: &str) -> &str {
    // Step 2
    if path.chars().next() != Some('/') {
        return "/";
    }

    // Step 3
    let rightmost_slash_idx = path.rfind('/').unwrap();
    if rightmost_slash_idx == 0 {
        // There's only one slash; it's the first character.
        return "/";
    }

    // Step 4
    &path[..rightmost_slash_idx]
}

/// Whether `s` ends with `"." + suffix`. The suffix is never dot-prefixed.
pub(crate) fn has_dot_suffix(s: &str, suffix: &str) -> bool {
    s.len() > suffix.len()
        && s.as_bytes()[s.len() - suffix.len() - 1] == b'.'
        && s.ends_with(suffix)
}

pub(crate) fn is_ip(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok()
}
