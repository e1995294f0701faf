//! Cookie state management.
//!
//! This module provides the cookie jar itself: ingestion of `Set-Cookie`
//! assertions, retrieval of the cookies applicable to a request, and the
//! locked read-merge-write protocol that lets several processes share one
//! cookie file without losing updates.

use crate::codec;
use crate::cookie::{Cookie, CookieSource, SetCookie};
use crate::entry::{entry_id, Entry, END_OF_TIME};
use crate::error::Error;
use crate::host::{canonical_host, default_path};
use crate::lock::FileLock;
use crate::policy::Policy;
use crate::psl::PublicSuffixList;
use crate::store::Store;
use http::Uri;
use std::env;
use std::fmt;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A builder for configuring a [`CookieJar`].
#[derive(Default)]
pub struct CookieJarBuilder {
    psl: Option<Box<dyn PublicSuffixList>>,
    filename: Option<PathBuf>,
    no_persist: bool,
}

impl CookieJarBuilder {
    /// Create a new builder with no public suffix list and no backing
    /// file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `list` for public suffix decisions.
    ///
    /// Without a list, the last label of a domain is treated as its public
    /// suffix, which refuses cookies on top-level domains but nothing
    /// finer-grained than that.
    pub fn public_suffix_list(mut self, list: impl PublicSuffixList + 'static) -> Self {
        self.psl = Some(Box::new(list));
        self
    }

    /// Back the jar with the cookie file at `path`.
    ///
    /// The file is read when the jar is built and rewritten by
    /// [`CookieJar::save`]. It does not need to exist yet; parent
    /// directories are created on the first save.
    pub fn filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.filename = Some(path.into());
        self
    }

    /// Keep the configured filename but never read or write it. Useful for
    /// dry runs over a real configuration.
    pub fn no_persist(mut self) -> Self {
        self.no_persist = true;
        self
    }

    /// Build the jar, loading previously saved cookies if a backing file
    /// is configured and exists.
    pub fn build(self) -> Result<CookieJar, Error> {
        let jar = CookieJar {
            inner: Arc::new(Inner {
                policy: Policy::new(self.psl),
                store: Mutex::new(Store::default()),
                filename: self.filename,
                no_persist: self.no_persist,
            }),
        };

        jar.load()?;

        Ok(jar)
    }
}

/// A thread-safe cookie jar that can persist its contents to a file shared
/// with other processes.
///
/// Jars are designed to be shared across many concurrent requests, so
/// cloning the jar simply returns a new reference to the jar instead of
/// doing a deep clone.
#[derive(Clone)]
pub struct CookieJar {
    inner: Arc<Inner>,
}

struct Inner {
    policy: Policy,
    store: Mutex<Store>,
    filename: Option<PathBuf>,
    no_persist: bool,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                policy: Policy::new(None),
                store: Mutex::new(Store::default()),
                filename: None,
                no_persist: false,
            }),
        }
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("filename", &self.inner.filename)
            .field("no_persist", &self.inner.no_persist)
            .finish_non_exhaustive()
    }
}

impl CookieJar {
    /// Create an in-memory jar with no backing file and no public suffix
    /// list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new jar builder.
    pub fn builder() -> CookieJarBuilder {
        CookieJarBuilder::default()
    }

    /// A description of the public suffix list the jar was built with, if
    /// any.
    pub fn public_suffix_description(&self) -> Option<String> {
        self.inner.policy.psl_description()
    }

    /// Record the parsed `Set-Cookie` assertions received in a response to
    /// a request for `uri`.
    ///
    /// Cookies rejected by policy are logged and skipped; the call itself
    /// never fails. Requests outside the http family are ignored entirely.
    pub fn set_cookies<I>(&self, uri: &Uri, cookies: I)
    where
        I: IntoIterator<Item = SetCookie>,
    {
        self.set_cookies_at(uri, cookies, CookieSource::Http, SystemTime::now());
    }

    /// Like [`set_cookies`](Self::set_cookies), naming the interface the
    /// assignment arrives through.
    ///
    /// An entry stored with `HttpOnly` is neither replaced nor deleted by
    /// a [`CookieSource::NonHttp`] assignment, and such an assignment
    /// cannot create an `HttpOnly` entry either.
    pub fn set_cookies_from<I>(&self, uri: &Uri, cookies: I, source: CookieSource)
    where
        I: IntoIterator<Item = SetCookie>,
    {
        self.set_cookies_at(uri, cookies, source, SystemTime::now());
    }

    pub(crate) fn set_cookies_at<I>(
        &self,
        uri: &Uri,
        cookies: I,
        source: CookieSource,
        now: SystemTime,
    ) where
        I: IntoIterator<Item = SetCookie>,
    {
        if !is_http_scheme(uri) {
            return;
        }

        let host = match uri.host().map(canonical_host) {
            Some(Ok(host)) => host,
            _ => return,
        };

        let key = self.inner.policy.bucket_key(&host);
        let def_path = default_path(uri.path()).to_owned();

        let mut store = self.inner.store.lock().unwrap();

        for cookie in cookies {
            let name = cookie.name.clone();

            let mut entry = match self.build_entry(cookie, &host, &def_path, now) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("cookie {:?} for {} dropped: {}", name, host, e);
                    continue;
                }
            };

            let id = entry.id();

            match store.get(&key, &id).map(|e| (e.http_only, e.creation)) {
                Some((http_only, creation)) => {
                    if source == CookieSource::NonHttp && http_only {
                        tracing::warn!(
                            "cookie {:?} for {} dropped: existing cookie is HttpOnly",
                            name,
                            host
                        );
                        continue;
                    }

                    // Replacement in place keeps the original creation
                    // time, so retrieval order does not change.
                    entry.creation = creation;
                    store.put(key.clone(), entry);
                }
                None => {
                    if source == CookieSource::NonHttp && entry.http_only {
                        tracing::warn!(
                            "cookie {:?} for {} dropped: HttpOnly requires the HTTP interface",
                            name,
                            host
                        );
                        continue;
                    }

                    store.put(key.clone(), entry);
                }
            }
        }
    }

    /// Translate one parsed cookie into a store entry, per RFC 6265
    /// section 5.3.
    fn build_entry(
        &self,
        cookie: SetCookie,
        host: &str,
        def_path: &str,
        now: SystemTime,
    ) -> Result<Entry, Error> {
        let (domain, host_only) = self
            .inner
            .policy
            .domain_and_type(host, cookie.domain.as_deref().unwrap_or(""))?;

        let path = match cookie.path {
            Some(ref path) if path.starts_with('/') => path.clone(),
            _ => def_path.to_owned(),
        };

        // Max-Age takes precedence over Expires. A Max-Age of zero or
        // less is a deletion request, as is an Expires that has already
        // passed.
        let (expires, persistent) = if matches!(cookie.max_age, Some(age) if age <= 0) {
            // The entry stays behind as a just-expired tombstone so the
            // deletion still reaches the file and any peers before the
            // reaper collects it.
            (just_expired(now), true)
        } else if let Some(age) = cookie.max_age {
            (
                now.checked_add(Duration::from_secs(age as u64))
                    .unwrap_or(*END_OF_TIME),
                true,
            )
        } else if let Some(at) = cookie.expires {
            // Servers delete cookies by sending a stamp far in the past.
            // Such a stamp gets the same tombstone clamp; stored verbatim
            // it would fall outside the retention window and be reaped
            // before any peer could observe the deletion.
            (if at <= now { just_expired(now) } else { at }, true)
        } else {
            (*END_OF_TIME, false)
        };

        Ok(Entry {
            name: cookie.name,
            value: cookie.value,
            domain,
            host_only,
            path,
            secure: cookie.secure,
            http_only: cookie.http_only,
            persistent,
            creation: now,
            last_access: now,
            expires,
            updated: now,
        })
    }

    /// Return the cookies to send in a request for `uri`, longest path
    /// first.
    ///
    /// Retrieval never fails: malformed hosts and non-http schemes yield
    /// an empty list. Only `name` and `value` are populated on the
    /// returned cookies.
    pub fn cookies(&self, uri: &Uri) -> Vec<Cookie> {
        self.cookies_at(uri, SystemTime::now())
    }

    pub(crate) fn cookies_at(&self, uri: &Uri, now: SystemTime) -> Vec<Cookie> {
        if !is_http_scheme(uri) {
            return Vec::new();
        }

        let host = match uri.host().map(canonical_host) {
            Some(Ok(host)) => host,
            _ => return Vec::new(),
        };

        let key = self.inner.policy.bucket_key(&host);
        let secure = is_secure_scheme(uri);
        let path = match uri.path() {
            "" => "/",
            path => path,
        };

        let mut store = self.inner.store.lock().unwrap();

        let bucket = match store.bucket_mut(&key) {
            Some(bucket) => bucket,
            None => return Vec::new(),
        };

        let mut selected: Vec<&mut Entry> = bucket
            .values_mut()
            .filter(|entry| !entry.is_expired(now))
            .filter(|entry| entry.domain_matches(&host))
            .filter(|entry| entry.path_matches(path))
            .filter(|entry| !entry.secure || secure)
            .collect();

        for entry in &mut selected {
            entry.last_access = now;
        }

        sort_for_wire(&mut selected);

        selected
            .into_iter()
            .map(|entry| Cookie::new(entry.name.clone(), entry.value.clone()))
            .collect()
    }

    /// The value for a `Cookie` request header for `uri`, or `None` when
    /// no cookies apply.
    pub fn cookie_header(&self, uri: &Uri) -> Option<String> {
        let cookies = self.cookies(uri);

        if cookies.is_empty() {
            None
        } else {
            let values: Vec<String> = cookies.iter().map(ToString::to_string).collect();

            Some(values.join("; "))
        }
    }

    /// Enumerate every live cookie in the jar, longest path first, with
    /// domain, path and expiry populated.
    pub fn all_cookies(&self) -> Vec<Cookie> {
        self.all_cookies_at(SystemTime::now())
    }

    pub(crate) fn all_cookies_at(&self, now: SystemTime) -> Vec<Cookie> {
        let store = self.inner.store.lock().unwrap();

        let mut live: Vec<&Entry> = store.entries().filter(|e| !e.is_expired(now)).collect();

        sort_for_wire(&mut live);

        live.into_iter()
            .map(|entry| Cookie {
                name: entry.name.clone(),
                value: entry.value.clone(),
                domain: entry.domain.clone(),
                path: entry.path.clone(),
                expires: entry.persistent.then_some(entry.expires),
                secure: entry.secure,
                http_only: entry.http_only,
            })
            .collect()
    }

    /// Delete the cookie with `cookie`'s domain, path and name, as
    /// returned by [`all_cookies`](Self::all_cookies).
    ///
    /// The deletion reaches peers sharing the backing file on the next
    /// save.
    pub fn remove_cookie(&self, cookie: &Cookie) {
        self.remove_cookie_at(cookie, SystemTime::now());
    }

    pub(crate) fn remove_cookie_at(&self, cookie: &Cookie, now: SystemTime) {
        let key = self.inner.policy.bucket_key(&cookie.domain);
        let id = entry_id(&cookie.domain, &cookie.path, &cookie.name);

        let mut store = self.inner.store.lock().unwrap();

        if let Some(bucket) = store.bucket_mut(&key) {
            if let Some(entry) = bucket.get_mut(&id) {
                mark_deleted(entry, now);
            }
        }
    }

    /// Delete every cookie whose effective domain is exactly `host` after
    /// canonicalization (ports are stripped; subdomains are not swept).
    pub fn remove_all_host(&self, host: &str) {
        self.remove_all_host_at(host, SystemTime::now());
    }

    pub(crate) fn remove_all_host_at(&self, host: &str, now: SystemTime) {
        let host = match canonical_host(host) {
            Ok(host) => host,
            Err(_) => return,
        };

        let key = self.inner.policy.bucket_key(&host);

        let mut store = self.inner.store.lock().unwrap();

        if let Some(bucket) = store.bucket_mut(&key) {
            for entry in bucket.values_mut() {
                if entry.domain == host {
                    mark_deleted(entry, now);
                }
            }
        }
    }

    /// Delete everything in the jar.
    pub fn remove_all(&self) {
        self.remove_all_at(SystemTime::now());
    }

    pub(crate) fn remove_all_at(&self, now: SystemTime) {
        let mut store = self.inner.store.lock().unwrap();

        for entry in store.entries_mut() {
            mark_deleted(entry, now);
        }
    }

    /// Immediately drop entries that expired long enough ago that their
    /// deletion no longer needs to be communicated to peers.
    ///
    /// This also happens automatically during [`save`](Self::save).
    /// Entries expired more recently stay behind, invisible to reads, so
    /// that the deletion still reaches the file and any peers.
    pub fn prune(&self) {
        self.prune_at(SystemTime::now());
    }

    pub(crate) fn prune_at(&self, now: SystemTime) {
        self.inner.store.lock().unwrap().delete_expired(now);
    }

    /// Write the jar to its backing file, merging in whatever other
    /// processes have saved since the jar last touched the file.
    ///
    /// The read-merge-write cycle runs under an exclusive lock on a
    /// sibling lock file, so concurrent savers serialize and no update is
    /// lost: for every entry, the side with the later assignment wins,
    /// with ties going to this jar. After the save this jar reflects the
    /// merged state.
    ///
    /// Saving a jar built with [`no_persist`](CookieJarBuilder::no_persist)
    /// does nothing; saving a jar with no filename at all fails with
    /// [`Error::SaveWithoutLoad`].
    pub fn save(&self) -> Result<(), Error> {
        self.save_at(SystemTime::now())
    }

    pub(crate) fn save_at(&self, now: SystemTime) -> Result<(), Error> {
        if self.inner.no_persist {
            return Ok(());
        }

        let filename = self.inner.filename.as_ref().ok_or(Error::SaveWithoutLoad)?;

        let mut store = self.inner.store.lock().unwrap();

        if let Some(dir) = filename.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let _lock = FileLock::acquire(filename)?;

        let mut file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(filename)?;

        let mut data = String::new();
        file.read_to_string(&mut data)?;

        for entry in codec::decode(&data)? {
            let key = self.inner.policy.bucket_key(&entry.domain);
            store.adopt_if_newer(key, entry);
        }

        store.delete_expired(now);

        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        codec::encode(store.entries(), &mut file, now)?;

        Ok(())
    }

    /// Populate the store from the backing file. Missing files and
    /// missing parent directories mean a first run and are not errors.
    fn load(&self) -> Result<(), Error> {
        let filename = match &self.inner.filename {
            Some(filename) if !self.inner.no_persist => filename,
            _ => return Ok(()),
        };

        let mut store = self.inner.store.lock().unwrap();

        if let Some(dir) = filename.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                return Ok(());
            }
        }

        let _lock = FileLock::acquire(filename)?;

        let data = match fs::read_to_string(filename) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::Io(e)),
        };

        for entry in codec::decode(&data)? {
            let key = self.inner.policy.bucket_key(&entry.domain);
            store.adopt_if_newer(key, entry);
        }

        Ok(())
    }

    /// Encode the jar's persistent entries to `writer` in the cookie file
    /// format. No locking or merging is performed.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), Error> {
        let store = self.inner.store.lock().unwrap();

        codec::encode(store.entries(), writer, SystemTime::now())
    }

    /// Replace the jar's contents with entries decoded from `reader`. No
    /// locking or merging is performed.
    pub fn read_from(&self, reader: &mut impl Read) -> Result<(), Error> {
        let mut data = String::new();
        reader.read_to_string(&mut data)?;

        self.restore(&data)
    }

    /// Encode the jar's persistent entries to a string, in the same form
    /// [`write_to`](Self::write_to) produces.
    pub fn snapshot(&self) -> Result<String, Error> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Replace the jar's contents with entries decoded from a snapshot.
    pub fn restore(&self, data: &str) -> Result<(), Error> {
        let entries = codec::decode(data)?;

        let mut store = self.inner.store.lock().unwrap();
        store.clear();

        for entry in entries {
            let key = self.inner.policy.bucket_key(&entry.domain);
            store.put(key, entry);
        }

        Ok(())
    }
}

/// The conventional location of the shared cookie file: the `COOKIE_FILE`
/// environment variable when set, otherwise `.cookies` in the user's home
/// directory.
pub fn default_cookie_file() -> PathBuf {
    if let Some(path) = env::var_os("COOKIE_FILE") {
        return PathBuf::from(path);
    }

    let home = if cfg!(windows) {
        env::var_os("USERPROFILE")
    } else {
        env::var_os("HOME")
    };

    home.map(PathBuf::from).unwrap_or_default().join(".cookies")
}

fn is_http_scheme(uri: &Uri) -> bool {
    matches!(
        uri.scheme_str(),
        Some("http") | Some("https") | Some("ws") | Some("wss")
    )
}

fn is_secure_scheme(uri: &Uri) -> bool {
    matches!(uri.scheme_str(), Some("https") | Some("wss"))
}

/// Longest path first, then oldest first; the name breaks remaining ties
/// deterministically.
fn sort_for_wire<E: std::ops::Deref<Target = Entry>>(entries: &mut [E]) {
    entries.sort_by(|a, b| {
        b.path
            .len()
            .cmp(&a.path.len())
            .then_with(|| a.creation.cmp(&b.creation))
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn mark_deleted(entry: &mut Entry, now: SystemTime) {
    entry.value.clear();
    entry.expires = just_expired(now);
    entry.updated = now;
}

/// An instant just before `now`, so the entry is invisible to every read
/// but survives as a tombstone for the whole retention window.
fn just_expired(now: SystemTime) -> SystemTime {
    now.checked_sub(Duration::from_secs(1)).unwrap_or(UNIX_EPOCH)
}
