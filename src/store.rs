//! The in-memory cookie store.

use crate::entry::Entry;
use std::collections::HashMap;
use std::time::SystemTime;

/// Two-level index over entries: registrable domain, then entry id.
///
/// Keying the outer map by registrable domain bounds every retrieval scan
/// to a single bucket. Concurrency control is up to the owner.
#[derive(Debug, Default)]
pub(crate) struct Store {
    buckets: HashMap<String, HashMap<String, Entry>>,
}

impl Store {
    pub fn get(&self, key: &str, id: &str) -> Option<&Entry> {
        self.buckets.get(key).and_then(|bucket| bucket.get(id))
    }

    pub fn bucket_mut(&mut self, key: &str) -> Option<&mut HashMap<String, Entry>> {
        self.buckets.get_mut(key)
    }

    /// Insert `entry` into the bucket at `key`, displacing any entry with
    /// the same id.
    pub fn put(&mut self, key: String, entry: Entry) {
        self.buckets
            .entry(key)
            .or_default()
            .insert(entry.id(), entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.buckets.values().flat_map(|bucket| bucket.values())
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.buckets
            .values_mut()
            .flat_map(|bucket| bucket.values_mut())
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Adopt an entry read from another process's save. The incoming entry
    /// wins only when assigned strictly later than what is already here;
    /// ties go to the local side.
    pub fn adopt_if_newer(&mut self, key: String, incoming: Entry) {
        let bucket = self.buckets.entry(key).or_default();
        let id = incoming.id();

        let replace = match bucket.get(&id) {
            Some(existing) => incoming.updated > existing.updated,
            None => true,
        };

        if replace {
            bucket.insert(id, incoming);
        }
    }

    /// Remove entries that expired long enough ago that their deletion no
    /// longer needs to be communicated to peers.
    pub fn delete_expired(&mut self, now: SystemTime) {
        for bucket in self.buckets.values_mut() {
            bucket.retain(|_, entry| !entry.removable(now));
        }

        self.buckets.retain(|_, bucket| !bucket.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{END_OF_TIME, TOMBSTONE_RETENTION};
    use std::time::{Duration, UNIX_EPOCH};

    fn entry(name: &str, value: &str, updated_secs: u64) -> Entry {
        Entry {
            name: name.into(),
            value: value.into(),
            domain: "example.com".into(),
            host_only: true,
            path: "/".into(),
            secure: false,
            http_only: false,
            persistent: true,
            creation: UNIX_EPOCH,
            last_access: UNIX_EPOCH,
            expires: *END_OF_TIME,
            updated: UNIX_EPOCH + Duration::from_secs(updated_secs),
        }
    }

    #[test]
    fn put_replaces_same_id() {
        let mut store = Store::default();
        store.put("example.com".into(), entry("a", "1", 1));
        store.put("example.com".into(), entry("a", "2", 2));

        assert_eq!(store.entries().count(), 1);
        assert_eq!(store.entries().next().unwrap().value, "2");
    }

    #[test]
    fn adoption_prefers_later_updates() {
        let mut store = Store::default();
        store.put("example.com".into(), entry("a", "local", 5));

        // Older incoming entry loses.
        store.adopt_if_newer("example.com".into(), entry("a", "stale", 4));
        assert_eq!(store.entries().next().unwrap().value, "local");

        // Tie goes to the local side.
        store.adopt_if_newer("example.com".into(), entry("a", "tied", 5));
        assert_eq!(store.entries().next().unwrap().value, "local");

        // Strictly newer incoming entry wins.
        store.adopt_if_newer("example.com".into(), entry("a", "fresh", 6));
        assert_eq!(store.entries().next().unwrap().value, "fresh");

        // Entries only present on one side are kept.
        store.adopt_if_newer("example.com".into(), entry("b", "new", 1));
        assert_eq!(store.entries().count(), 2);
    }

    #[test]
    fn expired_entries_are_retained_through_the_tombstone_window() {
        let expired_at = UNIX_EPOCH + Duration::from_secs(100);
        let mut e = entry("a", "1", 1);
        e.expires = expired_at;

        let mut store = Store::default();
        store.put("example.com".into(), e);

        store.delete_expired(expired_at + Duration::from_secs(1));
        assert_eq!(store.entries().count(), 1);

        store.delete_expired(expired_at + TOMBSTONE_RETENTION);
        assert_eq!(store.entries().count(), 0);
    }
}
