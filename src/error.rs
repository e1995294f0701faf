//! Types for error handling.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// All possible types of errors that can be returned from this crate.
#[derive(Debug)]
pub enum Error {
    /// A request host could not be canonicalized.
    MalformedHost,
    /// A cookie carried a syntactically invalid `Domain` attribute.
    MalformedDomain,
    /// A cookie's `Domain` attribute is not authoritative for the request
    /// host, or targets a public suffix.
    IllegalDomain,
    /// A cookie tried to scope subdomains of an IP address literal, which
    /// leaves no host name for the cookie to belong to.
    NoHostname,
    /// The persistent cookie file could not be decoded.
    CorruptStore(serde_json::Error),
    /// The cookie file lock could not be acquired within the configured
    /// bound.
    LockContended,
    /// Save was requested on a jar that has no backing file.
    SaveWithoutLoad,
    /// An unknown I/O error.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedHost => f.write_str("malformed request host"),
            Error::MalformedDomain => f.write_str("malformed domain attribute"),
            Error::IllegalDomain => f.write_str("domain attribute not allowed for this host"),
            Error::NoHostname => f.write_str("no host name available to scope the cookie to"),
            Error::CorruptStore(e) => write!(f, "corrupt cookie file: {}", e),
            Error::LockContended => f.write_str("cookie file lock held by another process"),
            Error::SaveWithoutLoad => f.write_str("cookie jar has no backing file"),
            Error::Io(e) => write!(f, "{}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::CorruptStore(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[doc(hidden)]
impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}
