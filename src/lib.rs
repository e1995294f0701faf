#![deny(missing_docs)]
#![deny(unsafe_code)]

//! A persistent cookie jar conforming to [RFC 6265].
//!
//! The jar ingests parsed `Set-Cookie` assertions from HTTP responses,
//! answers with the correctly filtered and ordered cookies for subsequent
//! requests, and can persist its state to a file that cooperating processes
//! share through an advisory file lock and a read-merge-write save protocol.
//!
//! Header parsing is deliberately not part of this crate: assignments arrive
//! as [`SetCookie`] records that an HTTP client has already decomposed, and
//! request URLs arrive as [`http::Uri`] values.
//!
//! # Using a jar
//!
//! ```
//! use cookiejar::{CookieJar, SetCookie};
//! use http::Uri;
//!
//! let jar = CookieJar::new();
//! let uri: Uri = "http://example.com/".parse().unwrap();
//!
//! jar.set_cookies(&uri, [SetCookie::new("session", "opaque")]);
//!
//! for cookie in jar.cookies(&uri) {
//!     println!("{}", cookie);
//! }
//! ```
//!
//! # Sharing a jar between processes
//!
//! A jar built with a filename loads previously saved cookies on
//! construction. [`CookieJar::save`] locks the file, merges in whatever
//! other processes have saved since, and rewrites it, so no cooperating
//! writer loses an update:
//!
//! ```no_run
//! use cookiejar::CookieJar;
//!
//! # fn run() -> Result<(), cookiejar::Error> {
//! let jar = CookieJar::builder()
//!     .filename(cookiejar::default_cookie_file())
//!     .build()?;
//!
//! // ... use the jar ...
//!
//! jar.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Public suffixes
//!
//! Domain scoping decisions consult a [`PublicSuffixList`] so that a
//! response cannot set a cookie for a domain such as `co.uk` under which
//! unrelated parties register names. Any implementation can be injected;
//! with the `psl` feature enabled, a [`publicsuffix::List`] works directly.
//!
//! # Logging
//!
//! Cookies rejected by policy are reported through [`tracing`] at the
//! `warn` level; the jar otherwise skips them silently, as required for
//! ingesting untrusted responses.
//!
//! [RFC 6265]: https://tools.ietf.org/html/rfc6265

pub use http;

mod codec;
mod cookie;
mod entry;
mod error;
mod host;
mod jar;
mod lock;
mod policy;
mod psl;
mod store;

pub use crate::{
    cookie::{Cookie, CookieSource, SetCookie},
    error::Error,
    jar::{default_cookie_file, CookieJar, CookieJarBuilder},
    psl::PublicSuffixList,
};
