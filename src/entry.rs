//! The stored representation of a single cookie.

use crate::host::has_dot_suffix;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// In-memory expiry instant of session cookies: 9999-12-31 23:59:59 UTC.
/// Session cookies are never persisted, so the sentinel never reaches disk.
pub(crate) static END_OF_TIME: Lazy<SystemTime> =
    Lazy::new(|| UNIX_EPOCH + Duration::from_secs(253_402_300_799));

/// How long an expired entry is kept in the store past its expiry, so that
/// a save can still tell peer processes about the deletion before the entry
/// is physically removed.
pub(crate) const TOMBSTONE_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// One logical cookie as tracked by the store.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Entry {
    pub name: String,
    pub value: String,
    /// Effective domain: lowercase, punycoded, no leading dot.
    pub domain: String,
    /// A host-only entry matches only its exact origin host; otherwise any
    /// subdomain of `domain` matches too.
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// False for session cookies, which never reach the file.
    pub persistent: bool,
    #[serde(with = "unix_ms")]
    pub creation: SystemTime,
    #[serde(with = "unix_ms")]
    pub last_access: SystemTime,
    #[serde(with = "unix_ms")]
    pub expires: SystemTime,
    /// Instant of the last assignment. Merge conflicts between processes
    /// are decided by comparing this field.
    #[serde(with = "unix_ms")]
    pub updated: SystemTime,
}

impl Entry {
    /// Stable identifier of the entry within its domain bucket. Entries
    /// for the same `(domain, path, name)` triple always share an id.
    pub fn id(&self) -> String {
        entry_id(&self.domain, &self.path, &self.name)
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires <= now
    }

    /// Whether the entry expired long enough ago that its deletion no
    /// longer needs to be communicated to peers.
    pub fn removable(&self, now: SystemTime) -> bool {
        match self.expires.checked_add(TOMBSTONE_RETENTION) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    // http://tools.ietf.org/html/rfc6265#section-5.1.3
    pub fn domain_matches(&self, host: &str) -> bool {
        if self.domain == host {
            return true;
        }

        !self.host_only && has_dot_suffix(host, &self.domain)
    }

    // http://tools.ietf.org/html/rfc6265#section-5.1.4
    pub fn path_matches(&self, request_path: &str) -> bool {
        if request_path == self.path {
            return true;
        }

        if request_path.starts_with(&self.path) {
            if self.path.ends_with('/') || request_path[self.path.len()..].starts_with('/') {
                return true;
            }
        }

        false
    }
}

pub(crate) fn entry_id(domain: &str, path: &str, name: &str) -> String {
    format!("{};{};{}", domain, path, name)
}

/// Timestamps are written as signed milliseconds since the Unix epoch.
mod unix_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_millis() as i64,
            Err(e) => -(e.duration().as_millis() as i64),
        };

        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        let offset = Duration::from_millis(millis.unsigned_abs());

        Ok(if millis >= 0 {
            UNIX_EPOCH + offset
        } else {
            UNIX_EPOCH - offset
        })
    }
}
