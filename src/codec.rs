//! Encoding and decoding of the persistent cookie file.
//!
//! The on-disk form is a stream of JSON records, one per persistent entry,
//! each independently decodable. Very old releases wrote a single
//! two-level JSON object instead; such a file is accepted and treated as
//! empty state so that upgrading never fails.

use crate::entry::Entry;
use crate::error::Error;
use serde_json::Deserializer;
use std::io::Write;
use std::time::SystemTime;

/// Decode a record stream previously produced by [`encode`].
///
/// An empty input decodes to no entries rather than failing, as does input
/// that ends before the first record is complete. Anything else that is
/// not a valid record stream is a [`Error::CorruptStore`], except for the
/// legacy single-object form.
pub(crate) fn decode(data: &str) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::new();
    let mut stream = Deserializer::from_str(data).into_iter::<Entry>();

    loop {
        match stream.next() {
            None => return Ok(entries),
            Some(Ok(entry)) => entries.push(entry),
            Some(Err(e)) if e.is_eof() && stream.byte_offset() == 0 => return Ok(Vec::new()),
            Some(Err(e)) => {
                if entries.is_empty() && is_legacy_object(data) {
                    tracing::debug!("cookie file is in the old object format, starting empty");
                    return Ok(Vec::new());
                }

                return Err(Error::CorruptStore(e));
            }
        }
    }
}

/// Whether the whole input is one bare JSON object, the shape written by
/// old releases.
fn is_legacy_object(data: &str) -> bool {
    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(data).is_ok()
}

/// Write the persistent entries in `entries` to `writer`, one record per
/// line, in stable order so that repeated saves of the same state produce
/// identical files.
///
/// Session entries are skipped. The value of an already-expired entry is
/// irrelevant to peers and is written blank.
pub(crate) fn encode<'a, W: Write>(
    entries: impl Iterator<Item = &'a Entry>,
    writer: &mut W,
    now: SystemTime,
) -> Result<(), Error> {
    let mut records: Vec<&Entry> = entries.filter(|entry| entry.persistent).collect();
    records.sort_by(|a, b| {
        (&a.domain, &a.path, &a.name).cmp(&(&b.domain, &b.path, &b.name))
    });

    for entry in records {
        let mut record = entry.clone();
        if record.is_expired(now) {
            record.value.clear();
        }

        serde_json::to_writer(&mut *writer, &record).map_err(|e| Error::Io(e.into()))?;
        writer.write_all(b"\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::END_OF_TIME;
    use std::time::{Duration, UNIX_EPOCH};

    fn entry(name: &str, persistent: bool) -> Entry {
        Entry {
            name: name.into(),
            value: "v".into(),
            domain: "example.com".into(),
            host_only: true,
            path: "/".into(),
            secure: false,
            http_only: false,
            persistent,
            creation: UNIX_EPOCH,
            last_access: UNIX_EPOCH,
            expires: if persistent {
                UNIX_EPOCH + Duration::from_secs(1000)
            } else {
                *END_OF_TIME
            },
            updated: UNIX_EPOCH,
        }
    }

    fn encode_to_string(entries: &[Entry], now: SystemTime) -> String {
        let mut buf = Vec::new();
        encode(entries.iter(), &mut buf, now).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn empty_input_is_empty_state() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("   \n  ").unwrap().is_empty());
    }

    #[test]
    fn truncated_input_at_offset_zero_is_empty_state() {
        assert!(decode(r#"{"name": "a", "#).unwrap().is_empty());
    }

    #[test]
    fn legacy_object_is_empty_state() {
        assert!(decode("{}").unwrap().is_empty());
        assert!(decode(r#"{"example.com": {"example.com;/;a": {}}}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn garbage_is_corrupt() {
        assert!(matches!(decode("not json"), Err(Error::CorruptStore(_))));
        assert!(matches!(decode("[1, 2]"), Err(Error::CorruptStore(_))));
    }

    #[test]
    fn error_after_first_record_is_corrupt() {
        let data = encode_to_string(&[entry("a", true)], UNIX_EPOCH) + "{broken";

        assert!(matches!(decode(&data), Err(Error::CorruptStore(_))));
    }

    #[test]
    fn records_round_trip() {
        let data = encode_to_string(&[entry("a", true), entry("b", true)], UNIX_EPOCH);
        let decoded = decode(&data).unwrap();

        let mut names: Vec<&str> = decoded.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(decoded[0].domain, "example.com");
    }

    #[test]
    fn session_entries_are_skipped() {
        let data = encode_to_string(&[entry("session", false), entry("kept", true)], UNIX_EPOCH);
        let decoded = decode(&data).unwrap();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "kept");
    }

    #[test]
    fn expired_values_are_blanked() {
        let e = entry("a", true);
        let after_expiry = e.expires + Duration::from_secs(1);
        let data = encode_to_string(&[e], after_expiry);

        let decoded = decode(&data).unwrap();
        assert_eq!(decoded[0].value, "");
    }

    #[test]
    fn output_order_is_stable() {
        let a = encode_to_string(&[entry("a", true), entry("b", true)], UNIX_EPOCH);
        let b = encode_to_string(&[entry("b", true), entry("a", true)], UNIX_EPOCH);

        assert_eq!(a, b);
    }
}
